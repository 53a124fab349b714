//! Miscellaneous utility functions
pub mod lib;

pub(crate) use {
    crate::{
        config::{prelude::*, Cfg},
        stats::{
            self,
            decoding_stats::DecodingStatistics,
            report::{Report, StatSummary},
            ChannelStatistics, StatType, StatsOutput,
        },
    },
    flume,
    indicatif::{ProgressBar, ProgressStyle},
    owo_colors::OwoColorize,
    serde::{Deserialize, Serialize},
    sm::sm,
    std::{
        fmt, fs,
        io::{self, Write},
        path::{Path, PathBuf},
        process::ExitCode,
        str::FromStr,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, OnceLock,
        },
        thread::{Builder, JoinHandle},
        time::{Duration, Instant},
    },
};
