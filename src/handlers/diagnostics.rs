use crate::{models::DiagnosticsResponse, state::AppState};
use axum::{extract::State, Json};
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Session counters plus host resource usage
pub async fn diagnostics(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let stats = state.coordinator.stats();

    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Joined: {}, Rooms: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        stats.connections,
        stats.joined,
        stats.rooms
    );

    Json(DiagnosticsResponse {
        n_conn: stats.connections as u32,
        n_joined: stats.joined as u32,
        n_rooms: stats.rooms as u32,
        n_cached_docs: state.coordinator.cached_documents() as u32,
        n_user_ctx: state.coordinator.cached_identities() as u32,
        cpu_usage,
        memory_alloc,
        memory_total,
        memory_free,
    })
}
