//! Submit a snapshot file to a running SkyGuard server.

use clap::Parser;
use skyguard_cli::{load_snapshot, render_report};
use skyguard_sdk::SkyguardClient;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time;

/// Send an aircraft snapshot to the SkyGuard server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SkyGuard server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Snapshot JSON file
    #[arg(long)]
    file: PathBuf,

    /// Wait for the cycle report of this snapshot and print it
    #[arg(long)]
    wait_report: bool,

    /// Seconds to wait for the report
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let file = load_snapshot(&args.file)?;
    let epoch = file.epoch();
    let aircraft = file.into_aircraft();

    println!("Connecting to SkyGuard server at {}...", args.url);
    let client = SkyguardClient::new(&args.url);

    // Subscribe before submitting so the report cannot be missed.
    let mut stream = if args.wait_report {
        Some(client.stream_reports(None).await?)
    } else {
        None
    };

    let receipt = client.submit_snapshot(epoch, &aircraft).await?;
    println!(
        "Snapshot {} accepted: {} aircraft, {} rejected",
        receipt.sequence, receipt.accepted, receipt.rejected
    );
    for rejection in &receipt.rejections {
        println!("  {}", rejection);
    }

    let Some(stream) = stream.as_mut() else {
        return Ok(());
    };

    let wait = async {
        while let Some(report) = stream.next_report().await? {
            if report.sequence >= receipt.sequence {
                return Ok::<_, anyhow::Error>(Some(report));
            }
        }
        Ok(None)
    };

    match time::timeout(Duration::from_secs(args.timeout), wait).await {
        Ok(Ok(Some(report))) => print!("{}", render_report(&report)),
        Ok(Ok(None)) => eprintln!("Report stream closed before cycle {} completed", receipt.sequence),
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            eprintln!("No report within {}s, fetching latest", args.timeout);
            match client.report().await? {
                Some(report) => print!("{}", render_report(&report)),
                None => println!("No cycle has completed yet"),
            }
        }
    }

    Ok(())
}
