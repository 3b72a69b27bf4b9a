use tracing_subscriber::EnvFilter;

use strider_core::GLOBAL_CONFIG;

mod game;
mod terrain;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let ip_addr = format!("{}:{}", GLOBAL_CONFIG.server_address, GLOBAL_CONFIG.port);
    let mut game_server = game::GameServer::new(ip_addr);
    game_server.start_loop();
}
