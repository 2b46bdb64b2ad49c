//! Stream plumbing for redirections.
//!
//! Redirections are applied in order, so `> out 2>&1` sends both streams to
//! `out` while `2>&1 > out` leaves stderr on the parent's stdout. When two
//! descriptors end up on the same parent stream they share it through a
//! `RefCell`.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Write};

use crate::ast::{Redirect, RedirectTarget};
use crate::expand::expand_string;
use crate::handler::OpenMode;

use super::{Flow, Machine};

/// The three standard streams of the command being run.
pub(crate) struct Io<'a> {
    pub(crate) stdin: &'a mut dyn Read,
    pub(crate) stdout: &'a mut dyn Write,
    pub(crate) stderr: &'a mut dyn Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Stdout,
    Stderr,
    File(usize),
}

enum Writer<'c, 'w> {
    Parent(&'c RefCell<&'w mut dyn Write>),
    File(&'c File),
}

impl Write for Writer<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Parent(cell) => cell.borrow_mut().write(buf),
            Self::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Parent(cell) => cell.borrow_mut().flush(),
            Self::File(file) => file.flush(),
        }
    }
}

impl Machine<'_> {
    /// Runs `body` with `redirects` applied on top of `io`.
    ///
    /// A target that cannot be opened fails the command without running
    /// `body`.
    pub(super) fn with_redirects<F>(
        &mut self,
        redirects: &[Redirect],
        io: &mut Io<'_>,
        body: F,
    ) -> Flow
    where
        F: FnOnce(&mut Self, &mut Io<'_>) -> Flow,
    {
        if redirects.is_empty() {
            return body(self, io);
        }

        let mut files: Vec<File> = Vec::new();
        let mut input: Option<usize> = None;
        let mut out = Sink::Stdout;
        let mut err = Sink::Stderr;

        for redirect in redirects {
            let (word, mode) = match &redirect.target {
                RedirectTarget::Duplicate(source) => {
                    let sink = if *source == 2 { err } else { out };
                    match redirect.fd {
                        2 => err = sink,
                        1 => out = sink,
                        _ => {}
                    }
                    continue;
                }
                RedirectTarget::Read(word) => (word, OpenMode::Read),
                RedirectTarget::Write(word) => (word, OpenMode::Truncate),
                RedirectTarget::Append(word) => (word, OpenMode::Append),
            };
            let path = expand_string(word, self.state);
            match self.opener.open(&self.state.dir, &path, mode) {
                Ok(file) => {
                    let index = files.len();
                    files.push(file);
                    match redirect.fd {
                        0 => input = Some(index),
                        2 => err = Sink::File(index),
                        _ => out = Sink::File(index),
                    }
                }
                Err(error) => {
                    self.fail("open", error, &mut *io.stderr);
                    return Ok(());
                }
            }
        }

        let parent_out: RefCell<&mut dyn Write> = RefCell::new(&mut *io.stdout);
        let parent_err: RefCell<&mut dyn Write> = RefCell::new(&mut *io.stderr);
        let mut stdout = writer(out, &parent_out, &parent_err, &files);
        let mut stderr = writer(err, &parent_out, &parent_err, &files);
        let mut file_input = input.and_then(|index| files.get(index));
        let stdin: &mut dyn Read = match file_input.as_mut() {
            Some(file) => file,
            None => &mut *io.stdin,
        };
        let mut redirected = Io {
            stdin,
            stdout: &mut stdout,
            stderr: &mut stderr,
        };
        let result = body(self, &mut redirected);
        redirected.stdout.flush().ok();
        redirected.stderr.flush().ok();
        result
    }
}

fn writer<'c, 'w>(
    sink: Sink,
    parent_out: &'c RefCell<&'w mut dyn Write>,
    parent_err: &'c RefCell<&'w mut dyn Write>,
    files: &'c [File],
) -> Writer<'c, 'w> {
    match sink {
        Sink::Stdout => Writer::Parent(parent_out),
        Sink::Stderr => Writer::Parent(parent_err),
        // Sink indices always come from `files`.
        Sink::File(index) => files
            .get(index)
            .map_or(Writer::Parent(parent_out), Writer::File),
    }
}
