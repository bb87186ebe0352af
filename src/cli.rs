use clap::{Parser, ValueEnum};

/// Role this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Emit timestamp probes and measure round trips on the replies.
    Pub,
    /// Respond to probes by echoing them back to their source.
    Sub,
}

/// UDP round-trip latency monitor.
#[derive(Debug, Parser)]
#[command(name = "rttmon", version, about)]
pub struct Cli {
    /// Operation mode
    #[arg(short, long, value_enum)]
    pub mode: Mode,

    /// Responder port
    #[arg(short, long, default_value_t = 20121)]
    pub port: u16,

    /// Responder host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Stream identity carried in status lines
    #[arg(short, long, default_value_t = 1001)]
    pub stream_id: u32,

    /// Status line interval in seconds (0 is coerced to the 1s floor)
    #[arg(short = 'i', long, default_value_t = 0)]
    pub log_interval: u64,

    /// Delay between probes in milliseconds
    #[arg(long, default_value_t = 100)]
    pub probe_interval_ms: u64,

    /// Busy-spin between polls instead of backing off
    #[arg(long)]
    pub spin: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_wire_conventions() {
        let cli = Cli::parse_from(["rttmon", "--mode", "pub"]);
        assert_eq!(cli.mode, Mode::Pub);
        assert_eq!(cli.port, 20121);
        assert_eq!(cli.host, "localhost");
        assert_eq!(cli.stream_id, 1001);
        assert_eq!(cli.log_interval, 0);
        assert_eq!(cli.probe_interval_ms, 100);
        assert!(!cli.spin);
        assert!(!cli.debug);
    }

    #[test]
    fn mode_is_required() {
        assert!(Cli::try_parse_from(["rttmon"]).is_err());
    }
}
