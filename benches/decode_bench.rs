use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use dtbpipe::emulator::Emulator;
use dtbpipe::pipe::decoder::DtbEventDecoder;
use dtbpipe::pipe::splitter::DtbEventSplitter;
use dtbpipe::pipe::RawEventSource;
use dtbpipe::source::buffer_source::BufferSource;
use dtbpipe::source::file_source::{write_words, FileSource};
use dtbpipe::source::ChannelConfig;
use dtbpipe::words::device::{RocType, TbmType};

const EVENTS: usize = 10_000;

fn layouts() -> [(&'static str, ChannelConfig); 3] {
    [
        (
            "deser160",
            ChannelConfig::new(0, TbmType::None, RocType::Psi46digv21respin),
        ),
        (
            "tbm08b",
            ChannelConfig::new(0, TbmType::Tbm08b, RocType::Psi46digv21respin),
        ),
        (
            "tbm09",
            ChannelConfig::new(0, TbmType::Tbm09, RocType::Psi46digv21respin),
        ),
    ]
}

fn buffer_source(config: ChannelConfig, words: &[u16]) -> BufferSource {
    let mut source = BufferSource::new(config);
    source.add_words(words);
    source
}

pub fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    for (name, config) in layouts() {
        let words = Emulator::new(config, 4, 1).generate(EVENTS);
        let _ = group.throughput(Throughput::Elements(words.len() as u64));
        let _ = group.bench_with_input(BenchmarkId::from_parameter(name), &words, |b, words| {
            b.iter(|| {
                let mut splitter = DtbEventSplitter::new(buffer_source(config, words));
                while let Ok(record) = splitter.read() {
                    let _ = black_box(record);
                }
            })
        });
    }
    group.finish();
}

pub fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, config) in layouts() {
        let words = Emulator::new(config, 4, 1).generate(EVENTS);
        let _ = group.throughput(Throughput::Elements(EVENTS as u64));
        let _ = group.bench_with_input(BenchmarkId::from_parameter(name), &words, |b, words| {
            b.iter(|| {
                let mut decoder =
                    DtbEventDecoder::new(DtbEventSplitter::new(buffer_source(config, words)));
                while let Ok(event) = decoder.read() {
                    let _ = black_box(event);
                }
            })
        });
    }
    group.finish();
}

pub fn bench_read_file_source(c: &mut Criterion) {
    let config = ChannelConfig::new(0, TbmType::Tbm08b, RocType::Psi46digv21respin);
    let mut bytes = Vec::new();
    write_words(&mut bytes, &Emulator::new(config, 4, 1).generate(EVENTS)).unwrap();

    let mut group = c.benchmark_group("file_source");
    let _ = group.throughput(Throughput::Bytes(bytes.len() as u64));
    let _ = group.bench_function("decode_tbm08b", |b| {
        b.iter(|| {
            let source = FileSource::new(bytes.as_slice(), config);
            let mut decoder = DtbEventDecoder::new(DtbEventSplitter::new(source));
            while let Ok(event) = decoder.read() {
                let _ = black_box(event);
            }
        })
    });
    group.finish();
}
