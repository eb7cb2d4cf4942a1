//! Drives the engine against two plain directories standing in for the
//! lower and upper branches of a union mount, and prints what gets
//! materialized along the way.

use cowfs::branch::local::{LocalLowerBranch, LocalUpperBranch};
use cowfs::{CowConfig, SessionRegistry};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (lower_dir, upper_dir) = match (args.next(), args.next()) {
        (Some(l), Some(u)) => (l, u),
        _ => {
            eprintln!(
                "Usage: cow_demo <lower_dir> <upper_dir>\n\n  lower_dir: read-only branch directory; a 4 KiB demo file is created if missing\n  upper_dir: writable branch directory (created if not exist)"
            );
            std::process::exit(2);
        }
    };

    let lower_path = std::path::Path::new(&lower_dir).join("file1");
    let upper_path = std::path::Path::new(&upper_dir).join("file1");
    if let Err(e) = std::fs::create_dir_all(&lower_dir) {
        eprintln!("create lower dir failed: {e}");
        std::process::exit(1);
    }
    if !lower_path.exists()
        && let Err(e) = std::fs::write(&lower_path, vec![b'o'; 4096])
    {
        eprintln!("seed lower file failed: {e}");
        std::process::exit(1);
    }

    let config = CowConfig::default();
    let registry = Arc::new(SessionRegistry::new());
    let session = registry
        .open(
            "/file1",
            LocalLowerBranch::new(&lower_path),
            LocalUpperBranch::new(&upper_path),
            config,
        )
        .await
        .expect("open session");

    println!("initial: {:?}", session.stat().await);

    // Small scattered edits stay partial.
    session.write(100, &[b'A'; 10]).await.expect("write A");
    session.write(1000, &[b'B'; 1000]).await.expect("write B");
    println!("after small writes: {:?}", session.stat().await);

    // Growing the file past EOF leaves a zero hole.
    session.write(5096, &[b'J'; 500]).await.expect("write J");
    let hole = session.read(4096, 1000).await.expect("read hole");
    println!(
        "hole [4096, 5096) all zero: {} ({:?})",
        hole.iter().all(|&b| b == 0),
        session.stat().await
    );

    // A big write pushes coverage over the threshold: one full copy-up.
    session.write(1500, &[b'C'; 3500]).await.expect("write C");
    println!("after bulk write: {:?}", session.stat().await);

    session.truncate(2048).await.expect("truncate");
    println!("after truncate: {:?}", session.stat().await);

    let head = session.read(0, 16).await.expect("read head");
    println!("head bytes: {head:?}");
    session.close();
}
