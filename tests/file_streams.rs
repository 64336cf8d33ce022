//! Verse-file pipelines: scoped reads, word splitting, and the failure
//! path for a missing source file.

use std::io::Write;
use std::path::{Path, PathBuf};

use textpipes::{PipelineError, from_file};

fn verse_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("specs")
        .join("verse.data")
}

/// Split a line into owned words.
fn words(line: String) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

#[test]
fn four_lettered_words_of_the_verse() {
    let four_lettered = from_file(verse_path())
        .unwrap()
        .flat_map(words)
        .filter(|w| w.chars().count() == 4)
        .collect();
    assert_eq!(four_lettered, vec!["unam", "tibi", "tuum", "fili"]);
}

#[test]
fn verse_line_and_word_counts() {
    assert_eq!(from_file(verse_path()).unwrap().count(), 5);
    assert_eq!(from_file(verse_path()).unwrap().flat_map(words).count(), 26);
}

#[test]
fn verse_words_sorted_distinct() {
    let unique = from_file(verse_path())
        .unwrap()
        .flat_map(words)
        .sorted()
        .distinct()
        .collect();
    // "et" appears twice in the verse; everything else once.
    assert_eq!(unique.len(), 25);
    assert_eq!(unique.first().map(String::as_str), Some("amoris"));
    assert_eq!(unique.last().map(String::as_str), Some("unam"));
}

#[test]
fn missing_file_is_a_reported_failure() {
    let result = from_file("specs/no-such-verse.data");
    match result {
        Err(PipelineError::Io { path, source }) => {
            assert_eq!(path, PathBuf::from("specs/no-such-verse.data"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        Ok(_) => panic!("expected an Io error, got a pipeline"),
        Err(other) => panic!("expected an Io error, got {other:?}"),
    }
}

#[test]
fn io_error_display_names_the_path() {
    let err = from_file("specs/no-such-verse.data").err().unwrap();
    assert!(err.to_string().contains("no-such-verse.data"));
}

#[test]
fn reads_a_scratch_file_once_per_invocation() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "tuum est").unwrap();
    writeln!(file, "tuum erat").unwrap();

    let first_words = from_file(file.path())
        .unwrap()
        .flat_map(words)
        .distinct()
        .collect();
    assert_eq!(first_words, vec!["tuum", "est", "erat"]);

    // A fresh invocation re-reads the file and sees the same data.
    assert_eq!(from_file(file.path()).unwrap().count(), 2);
}
