//! Contains the [FileSource] that reads raw data in blocks from any reader, and [write_words] to produce raw data files
//!
//! Raw data files are flat sequences of little-endian 16-bit words.

use super::{ChannelConfig, PipeError, WordSource, DTB_SOURCE_BLOCK_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

/// Word source reading blocks of [DTB_SOURCE_BLOCK_SIZE] words from a reader.
pub struct FileSource<R: Read> {
    config: ChannelConfig,
    reader: R,
    byte_buf: Vec<u8>,
    block: Vec<u16>,
    pos: usize,
    last_word: u16,
    words_read: u64,
}

impl FileSource<BufReader<File>> {
    /// Open a raw data file.
    pub fn open(path: &Path, config: ChannelConfig) -> io::Result<Self> {
        let file = File::open(path)?;
        log::debug!("Opened {path} for {config}", path = path.display());
        Ok(Self::new(BufReader::new(file), config))
    }
}

impl<R: Read> FileSource<R> {
    /// Create a source reading from `reader`.
    pub fn new(reader: R, config: ChannelConfig) -> Self {
        Self {
            config,
            reader,
            byte_buf: vec![0; DTB_SOURCE_BLOCK_SIZE * 2],
            block: Vec::with_capacity(DTB_SOURCE_BLOCK_SIZE),
            pos: 0,
            last_word: super::buffer_source::BufferSource::INITIAL_LAST_WORD,
            words_read: 0,
        }
    }

    /// Total number of words handed out so far
    pub fn words_read(&self) -> u64 {
        self.words_read
    }

    // Fills the block with up to `DTB_SOURCE_BLOCK_SIZE` words, returns the number of words read
    fn fill_block(&mut self) -> Result<usize, PipeError> {
        let mut filled = 0;
        while filled < self.byte_buf.len() {
            match self.reader.read(&mut self.byte_buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled % 2 != 0 {
            log::warn!(
                "Channel {ch}: raw data ends with an incomplete word, ignoring the last byte",
                ch = self.config.channel
            );
        }
        let words = filled / 2;
        self.block.resize(words, 0);
        LittleEndian::read_u16_into(&self.byte_buf[..words * 2], &mut self.block);
        self.pos = 0;
        log::trace!(
            "Channel {ch}: read block of {words} words",
            ch = self.config.channel
        );
        Ok(words)
    }
}

impl<R: Read> WordSource for FileSource<R> {
    fn read_next(&mut self) -> Result<u16, PipeError> {
        if self.pos >= self.block.len() && self.fill_block()? == 0 {
            return Err(PipeError::BufferEmpty);
        }
        let word = self.block[self.pos];
        self.pos += 1;
        self.words_read += 1;
        self.last_word = word;
        Ok(word)
    }

    fn read_last(&self) -> u16 {
        self.last_word
    }

    fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

/// Write words as little-endian 16-bit values.
pub fn write_words<W: Write>(writer: &mut W, words: &[u16]) -> io::Result<()> {
    let mut bytes = vec![0; words.len() * 2];
    LittleEndian::write_u16_into(words, &mut bytes);
    writer.write_all(&bytes)
}
