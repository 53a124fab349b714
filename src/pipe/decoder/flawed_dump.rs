//! Ring buffer of recent raw events, dumped around events that raised decoding errors

use ringbuffer::{ConstGenericRingBuffer, RingBuffer};

/// Keeps the last [FlawedEventDump::RING_SIZE] formatted raw events.
///
/// When an event raises event, TBM or ROC errors it is marked as flawed, three events later the
/// ring holds the flawed event with its three predecessors and successors and is handed out for logging.
pub(crate) struct FlawedEventDump {
    ring: ConstGenericRingBuffer<String, 7>,
    total_event: u64,
    flawed_event: u64,
    dump_count: u32,
}

impl Default for FlawedEventDump {
    fn default() -> Self {
        Self {
            ring: ConstGenericRingBuffer::<_, 7>::new(),
            // Starts past the dump position of a flawed event 0, nothing is dumped before the ring is filled
            total_event: 5,
            flawed_event: 0,
            dump_count: 0,
        }
    }
}

impl FlawedEventDump {
    pub(crate) const RING_SIZE: usize = 7;
    pub(crate) const MAX_DUMPS: u32 = 100;

    /// Store a formatted event. Returns the ring content (oldest first) when a dump is due.
    pub(crate) fn record(&mut self, formatted_event: String, flawed: bool) -> Option<Vec<String>> {
        self.ring.push(formatted_event);
        self.total_event += 1;
        if flawed {
            self.flawed_event = self.total_event;
        }

        if self.total_event != self.flawed_event + 3 || self.dump_count >= Self::MAX_DUMPS {
            return None;
        }
        self.dump_count += 1;
        if self.dump_count == Self::MAX_DUMPS {
            log::warn!(
                "Reached {max} flawed event dumps, no further events will be dumped",
                max = Self::MAX_DUMPS
            );
        }
        Some(self.ring.iter().cloned().collect())
    }

    #[cfg(test)]
    pub(crate) fn dump_count(&self) -> u32 {
        self.dump_count
    }
}
