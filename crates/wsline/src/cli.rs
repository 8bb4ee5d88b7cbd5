//! Command-line flags and how they layer over loaded settings.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use wsline_core::constants::{NAME, VERSION};
use wsline_settings::WslineSettings;

/// Connect to a WebSocket server or listen for clients, line by line.
#[derive(Parser, Debug)]
#[command(name = NAME, version = VERSION, about)]
#[command(group(ArgGroup::new("mode").required(true).args(["listen", "connect"])))]
pub struct Cli {
    /// Listen on port.
    #[arg(short = 'l', long, value_name = "PORT")]
    pub listen: Option<u16>,

    /// Connect to a WebSocket server.
    #[arg(short = 'c', long, value_name = "URL")]
    pub connect: Option<String>,

    /// Enable debug log.
    #[arg(long)]
    pub debug: bool,

    /// Run without color.
    #[arg(long)]
    pub no_color: bool,

    /// Print a notification when a ping or pong is received.
    #[arg(short = 'P', long)]
    pub show_ping_pong: bool,

    /// Subprotocol to request (client) or require (server).
    #[arg(short = 's', long)]
    pub subprotocol: Option<String>,

    /// Settings file to load instead of `~/.wsline/settings.json`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to bind when listening.
    #[arg(long, value_name = "HOST", help_heading = "Listen Options")]
    pub listen_host: Option<String>,

    /// Echo text frames back to the client.
    #[arg(long, help_heading = "Listen Options")]
    pub echo: bool,

    /// Origin header for the handshake.
    #[arg(short = 'o', long, help_heading = "Connect Options")]
    pub origin: Option<String>,

    /// Send this line after connecting, then exit.
    #[arg(short = 'x', long, value_name = "LINE", help_heading = "Connect Options")]
    pub execute: Option<String>,

    /// Seconds to wait for replies after `--execute`.
    #[arg(short = 'w', long, value_name = "SECS", help_heading = "Connect Options")]
    pub wait: Option<u64>,

    /// Host header override.
    #[arg(long, help_heading = "Connect Options")]
    pub host: Option<String>,

    /// Do not check for unauthorized certificates.
    #[arg(short = 'n', long, help_heading = "Connect Options")]
    pub no_check: bool,

    /// Set an HTTP header <name:value>. Repeat to set several.
    #[arg(
        short = 'H',
        long = "header",
        value_name = "NAME:VALUE",
        value_parser = parse_header,
        help_heading = "Connect Options"
    )]
    pub headers: Vec<(String, String)>,

    /// Add a basic HTTP authentication header <username:password>.
    #[arg(long, value_name = "USER:PASS", help_heading = "Connect Options")]
    pub auth: Option<String>,

    /// Enable control commands (/ping, /pong, /text, /binary, /close [code [reason]]).
    #[arg(long, help_heading = "Connect Options")]
    pub slash: bool,

    /// Control command prefix (implies --slash).
    #[arg(long, value_name = "CHAR", help_heading = "Connect Options")]
    pub prefix: Option<char>,
}

impl Cli {
    /// Overlay the flags that were given onto `settings`.
    pub fn apply(&self, settings: &mut WslineSettings) {
        if self.debug {
            settings.output.debug = true;
        }
        if self.no_color {
            settings.output.color = false;
        }
        if self.show_ping_pong {
            settings.client.show_control_frames = true;
            settings.server.show_control_frames = true;
        }
        if let Some(subprotocol) = &self.subprotocol {
            settings.client.subprotocol = Some(subprotocol.clone());
            settings.server.subprotocol = Some(subprotocol.clone());
        }

        if let Some(port) = self.listen {
            settings.server.port = port;
        }
        if let Some(host) = &self.listen_host {
            settings.server.host.clone_from(host);
        }
        if self.echo {
            settings.server.echo = true;
        }

        let client = &mut settings.client;
        if self.origin.is_some() {
            client.origin.clone_from(&self.origin);
        }
        if self.execute.is_some() {
            client.execute.clone_from(&self.execute);
        }
        if let Some(wait) = self.wait {
            client.wait_secs = wait;
        }
        if self.host.is_some() {
            client.host.clone_from(&self.host);
        }
        if self.no_check {
            client.no_tls_check = true;
        }
        for (name, value) in &self.headers {
            let _ = client.headers.insert(name.clone(), value.clone());
        }
        if self.auth.is_some() {
            client.auth.clone_from(&self.auth);
        }
        if self.slash {
            client.slash_commands = true;
        }
        if let Some(prefix) = self.prefix {
            client.control_prefix = prefix;
            client.slash_commands = true;
        }
    }
}

/// Parse `name:value`. Surrounding whitespace is trimmed from both parts.
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected <name:value>, got \"{raw}\""))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in \"{raw}\""));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
