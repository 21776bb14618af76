//! End-to-end tests for the `pagewise` binary, driven with plain-text
//! documents so no pdfium library is needed.

#![allow(deprecated)] // cargo_bin deprecation

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

struct Library {
    dir: TempDir,
}

impl Library {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "words_per_page = 10\n").unwrap();
        Self { dir }
    }

    fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a text document of `count` words named w1, w2, ...
    fn book(&self, name: &str, count: usize) -> PathBuf {
        let words: Vec<String> = (1..=count).map(|n| format!("w{n}")).collect();
        let path = self.dir.path().join(name);
        fs::write(&path, words.join(" ")).unwrap();
        path
    }

    fn pagewise(&self) -> Command {
        let mut cmd = Command::cargo_bin("pagewise").expect("binary 'pagewise' should be built");
        cmd.arg("--data-dir").arg(self.data_dir());
        cmd.env_remove("PAGEWISE_CONFIG");
        cmd
    }
}

#[test]
fn read_prints_first_page_and_status() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("w1 w2 w3 w4 w5 w6 w7 w8 w9 w10\n"))
        .stdout(predicate::str::contains("w11").not())
        .stdout(predicate::str::contains("story.txt | page 1/3"));
}

#[test]
fn progress_is_kept_between_runs() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("next")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("w11 w12"))
        .stdout(predicate::str::contains("page 2/3"));

    library
        .pagewise()
        .arg("next")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("w21 w22 w23 w24 w25"))
        .stdout(predicate::str::contains("page 3/3"));

    // Already on the last page.
    library
        .pagewise()
        .arg("next")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("page 3/3"));

    library
        .pagewise()
        .args(["prev"])
        .arg(&book)
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("page 1/3"));
}

#[test]
fn read_can_jump_to_a_page() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .args(["--page", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("w21"))
        .stdout(predicate::str::contains("page 3/3"));

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .args(["--page", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page 3/3"));
}

#[test]
fn words_per_page_flag_overrides_config() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .args(["--words-per-page", "5", "read"])
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("w1 w2 w3 w4 w5\n"))
        .stdout(predicate::str::contains("page 1/5"));

    library
        .pagewise()
        .args(["--words-per-page", "0", "read"])
        .arg(&book)
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn search_lists_matching_pages() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("search")
        .arg(&book)
        .arg("W21")
        .assert()
        .success()
        .stdout("page 3\n");

    library
        .pagewise()
        .arg("search")
        .arg(&book)
        .arg("zebra")
        .assert()
        .success()
        .stdout(predicate::str::contains("no pages contain"));
}

#[test]
fn bookmark_toggles_on_the_current_page() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("bookmark")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("bookmarked page 1"));

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("| bookmarked"));

    library
        .pagewise()
        .arg("bookmark")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("removed bookmark from page 1"));
}

#[test]
fn notes_can_be_added_listed_and_deleted() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .args(["--page", "2"])
        .assert()
        .success();

    library
        .pagewise()
        .arg("note")
        .arg(&book)
        .args(["add", "remember this"])
        .assert()
        .success()
        .stdout(predicate::str::contains("on page 2"));

    let output = library
        .pagewise()
        .arg("note")
        .arg(&book)
        .arg("list")
        .output()
        .unwrap();
    assert!(output.status.success());
    let listing = String::from_utf8(output.stdout).unwrap();
    assert!(listing.contains("page 2\tremember this"));
    let id = listing.split('\t').next().unwrap().to_string();

    library
        .pagewise()
        .arg("note")
        .arg(&book)
        .args(["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted note"));

    library
        .pagewise()
        .arg("note")
        .arg(&book)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("no notes"));

    library
        .pagewise()
        .arg("note")
        .arg(&book)
        .args(["delete", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no note with id"));
}

#[test]
fn notes_show_on_their_page_when_reading() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .args(["--page", "2"])
        .assert()
        .success();

    library
        .pagewise()
        .arg("note")
        .arg(&book)
        .args(["add", "remember this"])
        .assert()
        .success();

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("note: remember this"));

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .args(["--page", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("note:").not());
}

#[test]
fn library_lists_progress_of_read_documents() {
    let library = Library::new();
    let first = library.book("first.txt", 25);
    let second = library.book("second.txt", 40);

    library
        .pagewise()
        .arg("library")
        .assert()
        .success()
        .stdout(predicate::str::contains("no documents yet"));

    library.pagewise().arg("next").arg(&first).assert().success();
    library.pagewise().arg("read").arg(&second).assert().success();

    library
        .pagewise()
        .arg("library")
        .assert()
        .success()
        .stdout(predicate::str::contains("first.txt\t2/3\t66%"))
        .stdout(predicate::str::contains("second.txt\t1/4\t25%"));
}

#[test]
fn direction_can_be_forced() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("direction")
        .arg(&book)
        .arg("rtl")
        .assert()
        .success()
        .stdout(predicate::str::contains("direction: rtl"));

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("| rtl"));

    library
        .pagewise()
        .arg("direction")
        .arg(&book)
        .arg("sideways")
        .assert()
        .failure();
}

#[test]
fn text_documents_have_no_source_pages() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("map")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("story.txt has no source pages"));

    let out = library.data_dir().join("page.png");
    library
        .pagewise()
        .arg("highlight")
        .arg(&book)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a PDF document"));
    assert!(!out.exists());
}

#[test]
fn source_page_options_need_a_pdf() {
    let library = Library::new();
    let book = library.book("story.txt", 25);

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .args(["--source-page", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("story.txt has no source pages"));

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .args(["--page", "2", "--source-page", "1"])
        .assert()
        .failure();

    let out = library.data_dir().join("page.png");
    library
        .pagewise()
        .arg("highlight")
        .arg(&book)
        .arg("--out")
        .arg(&out)
        .args(["--source-page", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a PDF document"));
    assert!(!out.exists());
}

#[test]
fn unreadable_inputs_fail_cleanly() {
    let library = Library::new();

    let blank = library.data_dir().join("blank.txt");
    fs::write(&blank, "   \n  ").unwrap();
    library
        .pagewise()
        .arg("read")
        .arg(&blank)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no readable text"));

    let docx = library.data_dir().join("report.docx");
    fs::write(&docx, "not really a document").unwrap();
    library
        .pagewise()
        .arg("read")
        .arg(&docx)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported"));

    library
        .pagewise()
        .arg("read")
        .arg(library.data_dir().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.txt"));
}

#[test]
fn malformed_config_is_reported() {
    let library = Library::new();
    let book = library.book("story.txt", 25);
    fs::write(library.data_dir().join("config.toml"), "words_per_page = [").unwrap();

    library
        .pagewise()
        .arg("read")
        .arg(&book)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}
