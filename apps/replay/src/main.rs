use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::{load_settings, load_settings_from},
    DeliberationStore, DispatchError, SessionContext, StoreRuntime,
};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{StatementId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{LobbyRoom, MembershipSubscription, RoomJoinRequest},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Replays a JSON-lines log of store events and prints the reconciled views.
#[derive(Parser, Debug)]
struct Args {
    /// One `{"type": ..., "payload": ...}` event per line.
    #[arg(long)]
    events: PathBuf,
    /// Signed-in user for the per-user views.
    #[arg(long)]
    user: Option<String>,
    /// Discussion whose rooms and members are reported.
    #[arg(long)]
    statement: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct RejectedLine {
    line: usize,
    #[serde(flatten)]
    error: ApiError,
}

#[derive(Serialize)]
struct AssignmentView<'a> {
    room_number: Option<u32>,
    participants: Vec<&'a UserId>,
}

#[derive(Serialize)]
struct StatementView<'a> {
    statement_id: &'a StatementId,
    current_request: Option<&'a RoomJoinRequest>,
    current_room: Option<&'a LobbyRoom>,
    room_assignments: Vec<AssignmentView<'a>>,
    joined: Vec<&'a UserId>,
    banned: Vec<&'a UserId>,
}

#[derive(Serialize)]
struct Report<'a> {
    applied: usize,
    rejected: Vec<RejectedLine>,
    requests: &'a [RoomJoinRequest],
    lobby_rooms: &'a [LobbyRoom],
    memberships: &'a [MembershipSubscription],
    #[serde(skip_serializing_if = "Option::is_none")]
    statement: Option<StatementView<'a>>,
}

fn statement_view<'a>(store: &'a DeliberationStore, statement_id: &'a StatementId) -> StatementView<'a> {
    let current_request = store.current_request(statement_id);
    let current_room =
        current_request.and_then(|request| store.lobby_room_of_statement(&request.statement_id));
    let partition = store.partition(statement_id);

    StatementView {
        statement_id,
        current_request,
        current_room,
        room_assignments: store
            .room_assignments(statement_id)
            .into_iter()
            .map(|assignment| AssignmentView {
                room_number: assignment.room_number,
                participants: assignment
                    .participants
                    .iter()
                    .map(|request| &request.participant.uid)
                    .collect(),
            })
            .collect(),
        joined: partition.joined.iter().map(|member| &member.user_id).collect(),
        banned: partition.banned.iter().map(|member| &member.user_id).collect(),
    }
}

fn rejection(line: usize, err: DispatchError) -> RejectedLine {
    let error = match &err {
        DispatchError::Store(store_err) => ApiError::from(store_err),
        DispatchError::Stopped => ApiError::new(ErrorCode::Internal, err.to_string()),
    };
    RejectedLine { line, error }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let runtime = StoreRuntime::spawn(DeliberationStore::default(), &settings);
    let handle = runtime.handle();
    let statement_id = args.statement.map(StatementId::new);
    handle.set_session(SessionContext::new(
        args.user.map(UserId::new),
        statement_id.clone(),
    ));

    let file = tokio::fs::File::open(&args.events)
        .await
        .with_context(|| format!("failed to open event log '{}'", args.events.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut applied = 0;
    let mut rejected = Vec::new();
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let raw: Value = match serde_json::from_str(trimmed) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(line = line_no, error = %err, "skipping line that is not JSON");
                rejected.push(RejectedLine {
                    line: line_no,
                    error: ApiError::new(ErrorCode::Validation, err.to_string()),
                });
                continue;
            }
        };

        match handle.apply_raw(raw).await {
            Ok(()) => applied += 1,
            Err(err) => rejected.push(rejection(line_no, err)),
        }
    }

    let store = runtime.shutdown().await?;
    info!(applied, rejected = rejected.len(), "replay finished");

    let report = Report {
        applied,
        rejected,
        requests: store.rooms().requests(),
        lobby_rooms: store.rooms().lobby_rooms(),
        memberships: store.membership().memberships(),
        statement: statement_id
            .as_ref()
            .map(|statement_id| statement_view(&store, statement_id)),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
