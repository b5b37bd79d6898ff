//! generate-pdf – reads an HTML document on stdin and writes the PDF to
//! stdout.
//!
//! Usage:
//!   generate-pdf < report.html > report.pdf
//!
//! Exits 1 with a one-line diagnostic on stderr when the input is empty or
//! rendering fails. Set `RUST_LOG=debug` for pipeline logs on stderr.

use std::io;
use std::process;

use pdf_press::{HtmlEngine, Invoker};

fn main() {
    env_logger::init();

    let invoker = Invoker::new(HtmlEngine);
    if let Err(e) = invoker.run(io::stdin().lock(), io::stdout().lock()) {
        eprintln!("{e}");
        process::exit(1);
    }
}
