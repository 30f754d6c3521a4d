//! Subcommand handlers.

use anyhow::Context;
use graphoni_core::{
    AuditQuery, GraphoniClient, GraphoniConfig, ProposalFilter, ProposalRequest, ProposalStatus,
    Query, QueryKind, QueryParts,
};
use graphoni_mcp::{McpServer, StdioTransport};
use serde::Serialize;
use tracing::{debug, info};

use crate::render;
use crate::{Commands, ConfigAction};

pub async fn handle_command(
    command: Commands,
    config: GraphoniConfig,
    json: bool,
) -> anyhow::Result<()> {
    let defaults = config.defaults.clone();
    debug!(?command, json, "Dispatching command");

    match command {
        Commands::Config { action } => return handle_config(action, &config),
        Commands::Mcp => return handle_mcp(config).await,
        _ => {}
    }

    let client = GraphoniClient::from_config(&config.server)?;

    match command {
        Commands::Search {
            query,
            limit,
            types,
        } => {
            let limit = limit.unwrap_or(defaults.search_limit);
            let results = client.search(&query, limit, &types).await?;
            emit(json, &results, || render::search(&results))
        }
        Commands::Node { id, hops, limit } => {
            let result = client
                .get_node(
                    &id,
                    hops.unwrap_or(defaults.node_hops),
                    limit.unwrap_or(defaults.node_limit),
                )
                .await?;
            emit_generic(json, &result)
        }
        Commands::Expand { id, hops, limit } => {
            let result = client
                .expand(
                    &id,
                    hops.unwrap_or(defaults.node_hops),
                    limit.unwrap_or(defaults.node_limit),
                )
                .await?;
            emit_generic(json, &result)
        }
        Commands::Path {
            from_node,
            to_node,
            max_length,
        } => {
            let max_length = max_length.unwrap_or(defaults.path_max_length);
            let result = client.find_path(&from_node, &to_node, max_length).await?;
            emit(json, &result, || render::path(&result))
        }
        Commands::Stats => {
            let stats = client.stats().await?;
            emit(json, &stats, || render::stats(&stats))
        }
        Commands::Query {
            cypher,
            search,
            community,
            level,
            types,
            filters,
            center,
            hops,
            limit,
        } => {
            let parts = QueryParts {
                node_types: (!types.is_empty()).then_some(types),
                filters,
                center_node: center,
                hops,
                cypher,
                q: search,
                community_id: community,
                level,
            };
            let query = Query::from_parts(query_kind(&parts), parts)?;
            let result = client
                .query(&query, limit.unwrap_or(defaults.query_limit))
                .await?;
            emit_generic(json, &result)
        }
        Commands::AddNode {
            label,
            node_type,
            reason,
            properties,
        } => {
            let request = ProposalRequest::add_node(label, node_type)
                .with_properties(properties.unwrap_or_default());
            emit_generic(json, &client.propose(&request, &reason).await?)
        }
        Commands::EditNode {
            id,
            reason,
            properties,
        } => {
            let request = ProposalRequest::edit_node(id, properties);
            emit_generic(json, &client.propose(&request, &reason).await?)
        }
        Commands::DeleteNode { id, reason } => {
            let request = ProposalRequest::delete_node(id);
            emit_generic(json, &client.propose(&request, &reason).await?)
        }
        Commands::AddEdge {
            source,
            target,
            edge_type,
            reason,
            properties,
        } => {
            let request = ProposalRequest::add_edge(source, target, edge_type)
                .with_properties(properties.unwrap_or_default());
            emit_generic(json, &client.propose(&request, &reason).await?)
        }
        Commands::EditEdge {
            id,
            reason,
            properties,
        } => {
            let request = ProposalRequest::edit_edge(id, properties);
            emit_generic(json, &client.propose(&request, &reason).await?)
        }
        Commands::DeleteEdge { id, reason } => {
            let request = ProposalRequest::delete_edge(id);
            emit_generic(json, &client.propose(&request, &reason).await?)
        }
        Commands::Proposals {
            status,
            limit,
            offset,
        } => {
            let filter = ProposalFilter {
                status: status
                    .as_deref()
                    .map(str::parse::<ProposalStatus>)
                    .transpose()?,
                limit: limit.unwrap_or(defaults.list_limit),
                offset,
            };
            let proposals = client.list_proposals(&filter).await?;
            emit(json, &proposals, || render::proposals(&proposals))
        }
        Commands::Proposal { id } => emit_generic(json, &client.get_proposal(&id).await?),
        Commands::Approve { id, comment } => {
            emit_generic(json, &client.approve(&id, comment.as_deref()).await?)
        }
        Commands::Reject { id, comment } => {
            emit_generic(json, &client.reject(&id, comment.as_deref()).await?)
        }
        Commands::Audit {
            node,
            action,
            user,
            limit,
            offset,
        } => {
            let query = AuditQuery {
                limit: limit.unwrap_or(defaults.list_limit),
                offset,
                target_node_id: node,
                action,
                user_id: user,
            };
            let entries = client.audit_log(&query).await?;
            emit(json, &entries, || render::audit(&entries))
        }
        Commands::Me => emit_generic(json, &client.me().await?),
        Commands::Config { .. } | Commands::Mcp => Ok(()),
    }
}

/// The variant picked by the flags given. Structured when no variant flag is set.
fn query_kind(parts: &QueryParts) -> QueryKind {
    if parts.cypher.is_some() {
        QueryKind::Raw
    } else if parts.q.is_some() {
        QueryKind::Search
    } else if parts.community_id.is_some() {
        QueryKind::Community
    } else {
        QueryKind::Structured
    }
}

/// Print `value` as pretty JSON or through its human layout.
///
/// Client replies serialize as the server payload, so `--json` shows exactly
/// what the server sent.
fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> anyhow::Result<()> {
    let out = if json { json_output(value)? } else { human() };
    print!("{out}");
    Ok(())
}

fn json_output<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

fn emit_generic<T: Serialize>(json: bool, value: &T) -> anyhow::Result<()> {
    let value = serde_json::to_value(value)?;
    emit(json, &value, || render::value(&value))
}

fn handle_config(action: ConfigAction, config: &GraphoniConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = graphoni_core::config::config_path()
                .context("No configuration directory on this platform")?;
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&config_path, graphoni_core::config::default_config_toml()?)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
            Ok(())
        }
    }
}

async fn handle_mcp(config: GraphoniConfig) -> anyhow::Result<()> {
    let client = GraphoniClient::from_config(&config.server)?;
    let mut server = McpServer::for_client(client, config.defaults)?;
    info!("Serving Graphoni tools over stdio");
    server.run(&mut StdioTransport::stdio()).await?;
    Ok(())
}
