use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use log::{error, info, warn};

pub mod api;
pub mod ratelimit;
pub mod routes;

pub use api::ServerState;

pub fn run_server(bind_addr: &str, state: Arc<ServerState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr)?;
    info!("drawlab server listening on http://{bind_addr}");

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = handle_connection(&mut stream, &state) {
                    warn!("request error: {err}");
                }
            }
            Err(err) => error!("connection failed: {err}"),
        }
    }

    Ok(())
}

fn handle_connection(stream: &mut TcpStream, state: &ServerState) -> std::io::Result<()> {
    let mut buffer = [0_u8; 65_536];
    let bytes_read = stream.read(&mut buffer)?;
    if bytes_read == 0 {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buffer[..bytes_read]);
    let request_line = request.lines().next().unwrap_or_default();
    let mut request_parts = request_line.split_whitespace();
    let method = request_parts.next().unwrap_or("GET");
    let path = request_parts.next().unwrap_or("/");

    let body = request
        .split("\r\n\r\n")
        .nth(1)
        .or_else(|| request.split("\n\n").nth(1))
        .unwrap_or("");

    let caller = stream
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let response = routes::route_request(method, path, body, &caller, state).to_http_string();
    stream.write_all(response.as_bytes())?;
    stream.flush()?;
    Ok(())
}
