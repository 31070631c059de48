use clap::Parser;

/// Either Ingress (HTTP API) or Worker (queue consumer), selected by a single
/// mode flag and configured entirely from the environment.
#[derive(Debug, Parser)]
#[command(name = "deploy", about = "Container workload provisioning service", version)]
pub struct Cli {
    /// Run in Ingress (server) mode. Absent means Worker mode.
    #[arg(long)]
    pub server: bool,
}
