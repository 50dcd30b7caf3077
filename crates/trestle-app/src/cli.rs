use clap::Parser;

/// trestle: request/response bridge between a host and embedded web content.
#[derive(Parser, Debug)]
#[command(name = "trestle", version, about)]
pub struct Args {
    /// Message routed through the demo echo channel.
    #[arg(short = 'm', long)]
    pub message: Option<String>,

    /// Call timeout override in milliseconds (0 disables timeouts).
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Page URL the demo navigates to.
    #[arg(long)]
    pub url: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
