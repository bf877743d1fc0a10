use std::sync::Arc;

use file_kit::{
    BasicFile, FileReader, FileWriter, MetadataProvider, PathOps, TextFile, TracingObserver,
    UnixOps,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::temp_dir().join("file_kit_hello.txt");
    println!("File: {}", path.display());

    // nothing is opened yet, only the path is resolved
    let mut file = BasicFile::new(&path)?.with_observer(Arc::new(TracingObserver));

    // creates (or truncates) the file and keeps it open read-write
    file.create()?;
    file.write_str("Hello\nWorld\n")?;

    // syncs, closes the descriptor and drops cached metadata
    file.flush()?;
    assert!(!file.is_open());

    // the next read reopens transparently
    let content = file.read_to_end()?;
    println!("{} bytes read back", content.len());

    // metadata is queried once, then served from the cache
    println!("{}", file.describe()?);
    println!("size: {}, ext: {}", file.size()?, file.ext());

    let mut text = TextFile::new(file);
    let greeting = text.lines()?.join(", ");
    println!("{greeting}!");

    // removes the file; later operations fail with not-found
    let mut file = text.into_inner();
    file.remove()?;
    assert!(file.stat().is_err_and(|e| e.is_not_found()));

    Ok(())
}
