//! Reassembly of the bit-serial readback words transported in ROC headers

/// Outcome of feeding one readback bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadbackCycle {
    /// Bit shifted in, no start marker seen
    Collecting,
    /// Start marker after exactly 16 bits, the word was stored
    Complete(u16),
    /// Misaligned start marker during the grace period (first marker of the ROC or dirty ROC)
    Ignored(u8),
    /// Misaligned start marker after the grace period
    Misaligned(u8),
}

/// Per-ROC shift registers, bit counters and collected readback words.
#[derive(Debug, Default, Clone)]
pub(crate) struct ReadbackCollector {
    shift_reg: Vec<u16>,
    count: Vec<u8>,
    readback: Vec<Vec<u16>>,
    dirty: Vec<bool>,
    // Set at the first start marker of a ROC, survives `take`
    synced: Vec<bool>,
}

impl ReadbackCollector {
    const DATA_BIT: u16 = 0x1;
    const START_MARKER: u16 = 0x2;
    const WORD_BITS: u8 = 16;

    fn register(&mut self, roc: usize) {
        if self.shift_reg.len() <= roc {
            self.shift_reg.resize(roc + 1, 0);
            self.count.resize(roc + 1, 0);
            self.dirty.resize(roc + 1, false);
            self.synced.resize(roc + 1, false);
        }
        if self.readback.len() <= roc {
            self.readback.resize(roc + 1, Vec::new());
        }
    }

    /// Shift the readback bits of one ROC header into the register of `roc`.
    pub(crate) fn eval(&mut self, roc: u8, value: u16) -> ReadbackCycle {
        let roc = usize::from(roc);
        self.register(roc);

        self.shift_reg[roc] = (self.shift_reg[roc] << 1) | (value & Self::DATA_BIT);
        self.count[roc] = self.count[roc].saturating_add(1);

        if value & Self::START_MARKER == 0 {
            return ReadbackCycle::Collecting;
        }

        let bits = self.count[roc];
        self.count[roc] = 0;
        let first_marker = !std::mem::replace(&mut self.synced[roc], true);
        if bits == Self::WORD_BITS {
            self.readback[roc].push(self.shift_reg[roc]);
            ReadbackCycle::Complete(self.shift_reg[roc])
        } else if first_marker || self.dirty[roc] {
            self.dirty[roc] = false;
            ReadbackCycle::Ignored(bits)
        } else {
            ReadbackCycle::Misaligned(bits)
        }
    }

    /// Store the last-DAC value of an analog ROC as its readback.
    pub(crate) fn push_last_dac(&mut self, roc: u8, value: u16) {
        let roc = usize::from(roc);
        self.register(roc);
        self.readback[roc].push(value);
    }

    /// Suppress the next misalignment report of every ROC.
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|d| *d = true);
    }

    /// Hand out the collected words and start over with empty lists.
    pub(crate) fn take(&mut self) -> Vec<Vec<u16>> {
        std::mem::take(&mut self.readback)
    }

    pub(crate) fn clear(&mut self) {
        self.shift_reg.clear();
        self.count.clear();
        self.readback.clear();
        self.dirty.clear();
        self.synced.clear();
    }
}
