use proptest::prelude::*;
use zerofile::chunk::{Tag, HEADER_SIZE};
use zerofile::cursor::Cursor;
use zerofile::params::{ExtractionParameters, HPitch};
use zerofile::scope::enter_chunk;
use zerofile::walker::ChunkWalker;
use zerofile::writer::{ChunkWriter, ZerofileWriter};
use zerofile::{Zerofile, ZerofileError};

fn capture_params() -> ExtractionParameters {
    ExtractionParameters::new(640, 1536, HPitch(0x37236cd9))
}

/// Envelope + leading record followed by arbitrary chunks, unchecked
fn zerofile_with(chunks: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let size = 36 + chunks
        .iter()
        .map(|(_, payload)| HEADER_SIZE + payload.len())
        .sum::<usize>();
    let mut storage = vec![0u8; size];
    let mut writer = ZerofileWriter::new(&mut storage, capture_params()).unwrap();
    for (tag, payload) in chunks {
        writer
            .chunks_mut()
            .write_chunk(Tag(*tag), payload)
            .unwrap();
    }
    writer.finish().unwrap().to_vec()
}

fn leading_record() -> Vec<u8> {
    let mut record = vec![0x00, 0x01, 0x00, 0x00];
    record.extend_from_slice(&640u32.to_le_bytes());
    record.extend_from_slice(&1536u32.to_le_bytes());
    record.extend_from_slice(&0x37236cd9u32.to_le_bytes());
    record
}

fn chunk_strategy() -> impl Strategy<Value = Vec<([u8; 4], Vec<u8>)>> {
    prop::collection::vec(
        (any::<[u8; 4]>(), prop::collection::vec(any::<u8>(), 0..48)),
        0..12,
    )
}

proptest! {
    #[test]
    fn walk_visits_every_chunk_in_file_order(chunks in chunk_strategy()) {
        let data = zerofile_with(&chunks);
        let mut file = Zerofile::open(&data).unwrap();

        let mut seen = Vec::new();
        while let Some((scope, header)) = file.walker_mut().next_sibling().unwrap() {
            seen.push((header.tag.0, scope.payload().to_vec()));
        }
        prop_assert_eq!(seen, chunks);
    }

    #[test]
    fn oversized_reads_never_consume(
        data in prop::collection::vec(any::<u8>(), 0..64),
        start in 0usize..64,
        extra in 1usize..32,
    ) {
        let mut cursor = Cursor::new(&data);
        let start = start.min(data.len());
        cursor.seek(start).unwrap();
        let remaining = cursor.remaining();

        let err = cursor.read_bytes(remaining + extra).unwrap_err();
        let is_out_of_bounds = matches!(err, ZerofileError::OutOfBounds { .. });
        prop_assert!(is_out_of_bounds);
        prop_assert!(cursor.peek_bytes(remaining + extra).is_err());
        prop_assert!(cursor.skip(remaining + extra).is_err());
        prop_assert_eq!(cursor.remaining(), remaining);
        prop_assert_eq!(cursor.position(), start);
    }

    #[test]
    fn written_chunks_read_back(tag in any::<[u8; 4]>(), payload in prop::collection::vec(any::<u8>(), 0..4096)) {
        let mut storage = vec![0u8; HEADER_SIZE + payload.len()];
        let mut writer = ChunkWriter::new(&mut storage);
        writer.write_chunk(Tag(tag), &payload).unwrap();
        let bytes = writer.finish().unwrap();

        let mut cursor = Cursor::new(bytes);
        let (scope, header) = enter_chunk(&mut cursor).unwrap();
        prop_assert_eq!(header.tag, Tag(tag));
        prop_assert_eq!(scope.payload(), &payload[..]);
        prop_assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn overlong_length_never_yields_a_scope(
        present in 0usize..64,
        excess in 1u32..1_000_000,
    ) {
        let mut data = b"PVOL".to_vec();
        data.extend_from_slice(&(present as u32 + excess).to_le_bytes());
        data.extend(std::iter::repeat(0xAB).take(present));

        let mut cursor = Cursor::new(&data);
        match enter_chunk(&mut cursor) {
            Err(ZerofileError::PayloadExceedsParent { declared, available, .. }) => {
                prop_assert_eq!(declared, present as u32 + excess);
                prop_assert_eq!(available, present);
            }
            other => prop_assert!(false, "expected PayloadExceedsParent, got {:?}", other),
        }
        prop_assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn find_chunk_only_moves_forward(
        picks in prop::collection::vec(0usize..3, 1..16),
        first in 0usize..3,
        second in 0usize..3,
    ) {
        let alphabet = [*b"CBUF", *b"PVOS", *b"CPLX"];
        let chunks: Vec<_> = picks.iter().map(|&i| (alphabet[i], vec![i as u8])).collect();
        let data = zerofile_with(&chunks);
        let mut file = Zerofile::open(&data).unwrap();
        let walker = file.walker_mut();

        let a = walker.find_chunk(Tag(alphabet[first])).unwrap();
        let b = walker.find_chunk(Tag(alphabet[second])).unwrap();
        if let (Some((a, _)), Some((b, _))) = (a, b) {
            prop_assert!(b.offset() > a.offset());
        }
    }
}

#[test]
fn leading_record_scenario() {
    // RIFF length covers the whole 36-byte file here
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&36u32.to_le_bytes());
    data.extend_from_slice(b"ZERO");
    data.extend_from_slice(b"SPLI");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend(leading_record());
    assert_eq!(data.len(), 36);

    let mut file = Zerofile::open(&data).unwrap();
    assert_eq!(file.params().width, 640);
    assert_eq!(file.params().height, 1536);
    assert_eq!(file.params().format_version.to_string(), "0.1.0");
    assert!(file.find_payload(Tag::PVOL).unwrap().is_none());

    // Same file with a conventional RIFF length
    data[4..8].copy_from_slice(&28u32.to_le_bytes());
    let mut file = Zerofile::open(&data).unwrap();
    assert!(file.walker_mut().find_chunk(Tag::PVOL).unwrap().is_none());
    assert_eq!(file.walker_mut().remaining(), 0);
}

#[test]
fn truncated_leading_record_scenario() {
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&28u32.to_le_bytes());
    data.extend_from_slice(b"ZERO");
    data.extend_from_slice(b"SPLI");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&leading_record()[..10]);

    match Zerofile::open(&data) {
        Err(ZerofileError::OutOfBounds {
            offset, scope_len, ..
        }) => {
            assert_eq!(offset, 8);
            assert_eq!(scope_len, 10);
        }
        other => panic!("expected OutOfBounds, got {:?}", other),
    }
}

#[test]
fn volume_size_mismatch_scenario() {
    let data = zerofile_with(&[(*b"PVOL", vec![0u8; 640 * 1536])]);
    let mut file = Zerofile::open(&data).unwrap();
    match file.next_payload() {
        Err(ZerofileError::SizeMismatch {
            tag,
            expected,
            actual,
        }) => {
            assert_eq!(tag, Tag::PVOL);
            assert_eq!(expected, 983_044);
            assert_eq!(actual, 983_040);
        }
        other => panic!("expected SizeMismatch, got {:?}", other.map(|p| p.map(|p| p.tag()))),
    }
    // The walker already sits past the damaged chunk
    assert!(file.next_payload().unwrap().is_none());
}

#[test]
fn multi_megabyte_round_trip() {
    let payload: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let data = zerofile_with(&[(*b"CBUF", payload.clone())]);
    let mut file = Zerofile::open(&data).unwrap();
    let cbuf = file.find_payload(Tag::CBUF).unwrap().unwrap();
    assert_eq!(cbuf.bytes(), &payload[..]);
    assert_eq!(cbuf.header().payload_length as usize, payload.len());
}

#[test]
fn nested_lists_need_explicit_descent() {
    let mut storage = vec![0u8; 128];
    let mut writer = ZerofileWriter::new(&mut storage, capture_params()).unwrap();
    let list = writer.begin_list(Tag(*b"ENVL")).unwrap();
    writer.write_payload(Tag::CBUF, b"inner").unwrap();
    writer.end_list(list).unwrap();
    writer.write_payload(Tag::CBUF, b"outer").unwrap();
    let data = writer.finish().unwrap();

    let mut file = Zerofile::open(data).unwrap();
    let (cbuf, _) = file.walker_mut().find_chunk(Tag::CBUF).unwrap().unwrap();
    assert_eq!(cbuf.payload(), b"outer");

    let mut file = Zerofile::open(data).unwrap();
    let (list, _) = file.walker_mut().next_entry().unwrap().unwrap();
    assert_eq!(list.form(), Some(Tag(*b"ENVL")));
    let mut children: ChunkWalker<'_> = list.walker();
    let (inner, _) = children.find_chunk(Tag::CBUF).unwrap().unwrap();
    assert_eq!(inner.payload(), b"inner");
}
