use std::time::Duration;

use clap::Parser;
use tokio::io::{self, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "reptile-cli")]
#[command(about = "Attach a terminal to a running REPL", long_about = None)]
struct Cli {
    /// REPL address
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    addr: String,

    /// Give up connecting after this many seconds
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let stream = tokio::time::timeout(
        Duration::from_secs(cli.timeout),
        TcpStream::connect(&cli.addr),
    )
    .await
    .map_err(|_| format!("timed out connecting to {}", cli.addr))??;

    let (mut remote_in, mut remote_out) = stream.into_split();

    let upstream = tokio::spawn(async move {
        let mut stdin = io::stdin();
        io::copy(&mut stdin, &mut remote_out).await?;
        remote_out.shutdown().await
    });

    // The session ends when the server closes it, even with stdin still open.
    let mut stdout = io::stdout();
    io::copy(&mut remote_in, &mut stdout).await?;
    stdout.flush().await?;
    upstream.abort();

    Ok(())
}
