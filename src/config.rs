use clap::Parser;
use std::path::PathBuf;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "thumbnail-gateway")]
#[command(about = "Thumbnail comment API with per-route rate limiting")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Most distinct rate keys kept in memory before eviction kicks in
    #[arg(long, default_value_t = 2000)]
    pub max_rate_keys: usize,

    // Read-modify-write attempts per comment append
    #[arg(long, default_value_t = 3)]
    pub append_attempts: u32,

    // JSON file of per-route policies merged over the built-in ones
    #[arg(long)]
    pub policy_file: Option<PathBuf>,

    // Longest accepted comment, in characters
    #[arg(long, default_value_t = 2000)]
    pub max_comment_len: usize,

    // Running behind a reverse proxy: key anonymous callers by x-forwarded-for
    #[arg(long)]
    pub trust_forwarded: bool,
}
