// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::io::{self, Read};

/// Bytes read ahead for content-type detection.
pub const SNIFF_WINDOW: usize = 8192;

/// Reader that buffers a bounded prefix of `inner` up front, then yields the
/// prefix followed by the rest of `inner` as one continuous stream.
///
/// Only the prefix is ever held in memory.
pub struct SniffedReader<R> {
    prefix: Vec<u8>,
    position: usize,
    inner: R,
}

impl<R: Read> SniffedReader<R> {
    pub fn new(inner: R) -> io::Result<Self> {
        Self::with_window(inner, SNIFF_WINDOW)
    }

    pub fn with_window(mut inner: R, window: usize) -> io::Result<Self> {
        let mut prefix = Vec::with_capacity(window);
        inner.by_ref().take(window as u64).read_to_end(&mut prefix)?;
        Ok(Self {
            prefix,
            position: 0,
            inner,
        })
    }

    /// The sniffed bytes; shorter than the window only when the stream is.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for SniffedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position < self.prefix.len() {
            let remaining = &self.prefix[self.position..];
            let count = remaining.len().min(buf.len());
            buf[..count].copy_from_slice(&remaining[..count]);
            self.position += count;
            return Ok(count);
        }
        self.inner.read(buf)
    }
}

/// Reader that fails once `inner` turns out longer or shorter than `expected`.
///
/// Lets a streaming write abort before anything is committed when a caller's
/// declared size is wrong. [`ExactReader::mismatch`] reports the observed length.
pub struct ExactReader<R> {
    inner: R,
    expected: u64,
    seen: u64,
    mismatch: Option<u64>,
}

impl<R: Read> ExactReader<R> {
    pub fn new(inner: R, expected: u64) -> Self {
        Self {
            inner,
            expected,
            seen: 0,
            mismatch: None,
        }
    }

    /// `Some(observed)` after the stream was found not to match `expected`.
    /// A long stream is only read one byte past `expected`.
    pub fn mismatch(&self) -> Option<u64> {
        self.mismatch
    }

    fn fail(&mut self) -> io::Error {
        self.mismatch = Some(self.seen);
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "stream length {} does not match declared size {}",
                self.seen, self.expected
            ),
        )
    }
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let remaining = self.expected.saturating_sub(self.seen);
        // One extra byte so an over-long stream is noticed.
        let window = (remaining.saturating_add(1)).min(buf.len() as u64) as usize;
        let count = self.inner.read(&mut buf[..window])?;
        self.seen += count as u64;
        if self.seen > self.expected || (count == 0 && self.seen < self.expected) {
            return Err(self.fail());
        }
        Ok(count)
    }
}
