use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use linesort::generate::{GenerateConfig, Generator};
use linesort::record::Record;
use linesort::sort::{SortConfig, SortProcessor};
use linesort::Error;

fn write_input(dir: &TempDir, lines: &[&str]) -> PathBuf {
    let path = dir.path().join("input.txt");
    let mut content = lines.join("\n");
    if !lines.is_empty() {
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

fn read_output(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn test_config(dir: &TempDir) -> SortConfig {
    SortConfig {
        temp_directory: dir.path().join("chunks"),
        ..Default::default()
    }
}

async fn run_sort(input: &Path, output: &Path, config: SortConfig) -> Result<linesort::SortStats> {
    Ok(linesort::sort_file(input, output, config).await?)
}

#[tokio::test]
async fn test_basic_sort() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(
        &dir,
        &[
            "415. Apple",
            "300. Banana",
            "99. Cherry",
            "1. Apple",
            "1000. Date",
            "50. Banana",
            "invalid line format",
            "200. Fig",
            "",
            "   ",
            "75. Apple",
        ],
    );
    let output = dir.path().join("output.txt");

    let stats = run_sort(&input, &output, test_config(&dir)).await?;

    assert_eq!(
        read_output(&output),
        vec![
            "1. Apple",
            "75. Apple",
            "415. Apple",
            "50. Banana",
            "300. Banana",
            "99. Cherry",
            "1000. Date",
            "200. Fig",
        ]
    );
    assert_eq!(stats.records_written, 8);
    assert_eq!(stats.invalid_lines, 3);

    Ok(())
}

#[tokio::test]
async fn test_duplicates_preserved() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(
        &dir,
        &["10. Apple", "5. Banana", "10. Apple", "1. Apple", "5. Banana", "20. Apple"],
    );
    let output = dir.path().join("output.txt");

    run_sort(&input, &output, test_config(&dir)).await?;

    assert_eq!(
        read_output(&output),
        vec!["1. Apple", "10. Apple", "10. Apple", "20. Apple", "5. Banana", "5. Banana"]
    );

    Ok(())
}

#[tokio::test]
async fn test_empty_input() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("input.txt");
    fs::write(&input, "")?;
    let output = dir.path().join("output.txt");
    let config = test_config(&dir);
    let temp_dir = config.temp_directory.clone();

    let stats = run_sort(&input, &output, config).await?;

    assert!(output.exists());
    assert_eq!(fs::read_to_string(&output)?, "");
    assert_eq!(stats.chunks_created, 0);
    assert!(!temp_dir.exists(), "empty temp dir should be removed");

    Ok(())
}

#[tokio::test]
async fn test_all_invalid_input() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, &["invalid", "also bad", "100 Apple"]);
    let output = dir.path().join("output.txt");
    let config = test_config(&dir);
    let temp_dir = config.temp_directory.clone();

    let stats = run_sort(&input, &output, config).await?;

    assert!(output.exists());
    assert_eq!(fs::read_to_string(&output)?, "");
    assert_eq!(stats.invalid_lines, 3);
    assert!(!temp_dir.exists());

    Ok(())
}

#[tokio::test]
async fn test_forced_chunking_sorts_and_cleans_up() -> Result<()> {
    let dir = TempDir::new()?;
    let lines: Vec<String> = [
        "415. Apple", "300. Banana", "99. Cherry", "1. Apple", "1000. Date",
        "50. Banana", "200. Fig", "75. Apple", "3. Grape", "88. Honeydew",
        "12. Kiwi", "7. Lemon", "640. Mango", "2. Nectarine",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let input = write_input(&dir, &line_refs);
    let output = dir.path().join("output.txt");

    let mut config = test_config(&dir);
    config.max_chunk_bytes = 60;
    let temp_dir = config.temp_directory.clone();

    let stats = run_sort(&input, &output, config).await?;

    assert!(
        stats.chunks_created >= 2,
        "60 byte budget over 14 records must produce several chunks"
    );

    let mut expected: Vec<Record> = lines.iter().map(|l| Record::parse(l).unwrap()).collect();
    expected.sort();
    let expected_lines: Vec<String> = expected.into_iter().map(|r| r.raw).collect();
    assert_eq!(read_output(&output), expected_lines);

    // No chunk files survive the run.
    assert!(!temp_dir.exists());

    Ok(())
}

#[tokio::test]
async fn test_output_lines_are_byte_equal_to_input_lines() -> Result<()> {
    let dir = TempDir::new()?;
    let originals = ["7. text with trailing spaces   ", "7. ", "-3.  leading space", "0. Tab\tinside"];
    let input = write_input(&dir, &originals);
    let output = dir.path().join("output.txt");

    run_sort(&input, &output, test_config(&dir)).await?;

    let sorted = read_output(&output);
    assert_eq!(sorted.len(), originals.len());
    for line in &sorted {
        assert!(originals.contains(&line.as_str()), "line was altered: {:?}", line);
        assert!(Record::parse(line).is_some());
    }

    Ok(())
}

#[tokio::test]
async fn test_sorting_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_input(&dir, &["5. Banana", "1. Apple", "2. Apple", "9. Cherry"]);
    let once = dir.path().join("once.txt");
    let twice = dir.path().join("twice.txt");

    run_sort(&input, &once, test_config(&dir)).await?;
    run_sort(&once, &twice, test_config(&dir)).await?;

    assert_eq!(fs::read(&once)?, fs::read(&twice)?);

    Ok(())
}

#[tokio::test]
async fn test_crlf_input_is_accepted() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("input.txt");
    fs::write(&input, "2. Beta\r\n1. Alpha\r\n")?;
    let output = dir.path().join("output.txt");

    run_sort(&input, &output, test_config(&dir)).await?;

    assert_eq!(read_output(&output), vec!["1. Alpha", "2. Beta"]);

    Ok(())
}

#[tokio::test]
async fn test_missing_input_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("does_not_exist.txt");
    let output = dir.path().join("output.txt");

    let result = run_sort(&input, &output, test_config(&dir)).await;

    match result {
        Err(err) => {
            let err = err.downcast::<Error>().unwrap();
            assert!(matches!(err, Error::InputMissing(_)));
        }
        Ok(_) => panic!("sorting a missing file must fail"),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_input_wins_over_blank_output_path() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("does_not_exist.txt");

    let result = run_sort(&input, Path::new(""), test_config(&dir)).await;

    let err = result.unwrap_err().downcast::<Error>().unwrap();
    assert!(matches!(err, Error::InputMissing(_)));
}

#[tokio::test]
async fn test_blank_output_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["1. Apple"]);

    let result = run_sort(&input, Path::new(""), test_config(&dir)).await;

    let err = result.unwrap_err().downcast::<Error>().unwrap();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_cancellation_removes_output_and_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let lines: Vec<String> = (0..200).map(|i| format!("{}. Record{}", i, i)).collect();
    let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let input = write_input(&dir, &line_refs);
    let output = dir.path().join("output.txt");

    let mut config = test_config(&dir);
    config.max_chunk_bytes = 64;
    let temp_dir = config.temp_directory.clone();

    let cancel = Arc::new(AtomicBool::new(true));
    let mut processor = SortProcessor::new(config)?.with_cancel_flag(cancel);

    // Cancellation is not an error for the caller.
    processor.sort(&input, &output).await?;

    assert!(!output.exists(), "cancelled run must not leave an output file");
    assert!(!temp_dir.exists(), "cancelled run must clean its chunks");

    Ok(())
}

#[tokio::test]
async fn test_generator_respects_size_bound() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("generated.txt");

    let config = GenerateConfig {
        target_bytes: 8 * 1024,
        lines_per_batch: 50,
        channel_capacity: 8,
        producer_count: 2,
        ..Default::default()
    };
    let max_line_bytes = (config.max_text_length + 32) as u64;

    let stats = linesort::generate_file(&output, config.clone()).await?;

    let size = fs::metadata(&output)?.len();
    assert_eq!(size, stats.bytes_written);
    assert!(size >= config.target_bytes);
    assert!(size < config.target_bytes + max_line_bytes);

    // Every generated line parses back into a record.
    for line in read_output(&output) {
        assert!(Record::parse(&line).is_some(), "bad generated line: {:?}", line);
    }

    Ok(())
}

#[tokio::test]
async fn test_generator_rejects_zero_target() {
    let config = GenerateConfig {
        target_bytes: 0,
        ..Default::default()
    };

    assert!(matches!(
        Generator::new(config),
        Err(Error::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_generated_file_sorts_cleanly() -> Result<()> {
    let dir = TempDir::new()?;
    let generated = dir.path().join("generated.txt");

    let config = GenerateConfig {
        target_bytes: 4 * 1024,
        lines_per_batch: 25,
        channel_capacity: 8,
        producer_count: 2,
        ..Default::default()
    };
    let stats = Generator::new(config)?.run(&generated).await?;
    assert!(stats.records_written > 0);

    let output = dir.path().join("sorted.txt");
    let mut sort_config = test_config(&dir);
    sort_config.max_chunk_bytes = 2 * 1024;
    let sort_stats = run_sort(&generated, &output, sort_config).await?;

    assert_eq!(sort_stats.invalid_lines, 0);
    assert_eq!(sort_stats.records_sorted, sort_stats.records_written);

    let records: Vec<Record> = read_output(&output)
        .iter()
        .map(|line| Record::parse(line).unwrap())
        .collect();
    assert!(records.windows(2).all(|pair| pair[0] <= pair[1]));

    Ok(())
}

#[tokio::test]
async fn test_cancelled_generation_keeps_partial_output() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("generated.txt");

    let config = GenerateConfig {
        target_bytes: u64::MAX,
        lines_per_batch: 10,
        channel_capacity: 4,
        producer_count: 1,
        ..Default::default()
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let generator = Generator::new(config)?.with_cancel_flag(cancel.clone());

    let run = tokio::spawn(async move { generator.run(&output).await });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel.store(true, Ordering::Relaxed);

    run.await??;

    let generated = dir.path().join("generated.txt");
    assert!(generated.exists(), "partial output stays in place");

    Ok(())
}
