use classad_common::error::ErrorKind;

use crate::{
    Dedup, Direction, Origin, QueryProcessor, Rectangles, Summary,
    tests::{
        BIG_IMAGE_SMALL_MEMORY, IMAGE_SIZE, MEMORY, add_machine, indexed, machines, run, window,
    },
};

/// Four machine ads, two by two identical, and their summary: representative `0` for
/// rectangles `0` and `1`, representative `1` for rectangles `2` and `3`.
fn summarized() -> (Rectangles, Summary) {
    let mut full = Rectangles::new();
    add_machine(&mut full, 10, 2048.0, "LINUX", Some(2048.0));
    add_machine(&mut full, 11, 2048.0, "LINUX", Some(2048.0));
    add_machine(&mut full, 12, 8192.0, "WINDOWS", None);
    add_machine(&mut full, 13, 8192.0, "WINDOWS", None);

    let mut summary = Summary::default();
    add_machine(&mut summary.rectangles, 10, 2048.0, "LINUX", Some(2048.0));
    add_machine(&mut summary.rectangles, 12, 8192.0, "WINDOWS", None);
    summary.dedup.assign(0, 0);
    summary.dedup.assign(0, 1);
    summary.dedup.assign(1, 2);
    summary.dedup.assign(1, 3);
    (full, summary)
}

fn index_len(processor: &QueryProcessor, attr: &str, direction: Direction) -> usize {
    processor
        .index(attr, direction)
        .map_or(0, |index| index.len())
}

#[test]
fn test_purge_without_summary() {
    let mut rects = machines();
    let mut processor = indexed(&rects);
    let jobs = window(&[BIG_IMAGE_SMALL_MEMORY]);
    assert_eq!(run(&mut processor, &jobs), vec![0, 1]);

    assert!(processor.purge_rectangle(0, &mut rects, None).unwrap());
    assert_eq!(run(&mut processor, &jobs), vec![1]);
    assert_eq!(index_len(&processor, MEMORY, Direction::Exported), 2);
    assert_eq!(index_len(&processor, IMAGE_SIZE, Direction::Imported), 1);
    assert!(!rects.is_live(0));

    assert!(!processor.purge_rectangle(0, &mut rects, None).unwrap());
    assert!(!processor.purge_rectangle(42, &mut rects, None).unwrap());
    assert_eq!(processor.live().to_vec(), vec![1, 2]);
}

#[test]
fn test_purge_constituents() {
    let (full, mut summary) = summarized();
    let mut processor = QueryProcessor::default();
    processor.initialize_indexes(&full, Some(&summary)).unwrap();
    assert!(processor.is_summarized());

    let jobs = window(&[BIG_IMAGE_SMALL_MEMORY]);
    assert_eq!(run(&mut processor, &jobs), vec![0, 1]);

    // A representative with constituents left stays indexed.
    assert!(
        processor
            .purge_rectangle(0, &mut summary.rectangles, Some(&mut summary.dedup))
            .unwrap()
    );
    assert_eq!(run(&mut processor, &jobs), vec![0, 1]);
    assert_eq!(index_len(&processor, MEMORY, Direction::Exported), 2);
    assert_eq!(index_len(&processor, IMAGE_SIZE, Direction::Imported), 1);
    assert!(summary.rectangles.is_live(0));

    // Its last constituent takes it out of every index.
    assert!(
        processor
            .purge_rectangle(1, &mut summary.rectangles, Some(&mut summary.dedup))
            .unwrap()
    );
    assert_eq!(run(&mut processor, &jobs), vec![1]);
    assert_eq!(index_len(&processor, MEMORY, Direction::Exported), 1);
    assert_eq!(index_len(&processor, IMAGE_SIZE, Direction::Imported), 0);
    assert!(!summary.rectangles.is_live(0));
    assert_eq!(summary.dedup.representatives.to_vec(), vec![1]);

    assert!(
        !processor
            .purge_rectangle(1, &mut summary.rectangles, Some(&mut summary.dedup))
            .unwrap()
    );
    for constituent in [2, 3] {
        assert!(
            processor
                .purge_rectangle(constituent, &mut summary.rectangles, Some(&mut summary.dedup))
                .unwrap()
        );
    }
    assert!(run(&mut processor, &jobs).is_empty());
    assert!(processor.live().is_empty());
}

#[test]
fn test_dedup_must_match_initialization() {
    let (full, mut summary) = summarized();
    let mut processor = QueryProcessor::default();
    processor.initialize_indexes(&full, Some(&summary)).unwrap();
    let err = processor
        .purge_rectangle(0, &mut summary.rectangles, None)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

    let mut rects = machines();
    let mut processor = indexed(&rects);
    let mut dedup = Dedup::new();
    assert!(
        processor
            .purge_rectangle(0, &mut rects, Some(&mut dedup))
            .is_err()
    );
}

#[test]
fn test_map_rectangle_ids_round_robin() {
    let (full, mut summary) = summarized();
    let mut processor = QueryProcessor::default();
    processor.initialize_indexes(&full, Some(&summary)).unwrap();

    let mut map = |id| {
        processor
            .map_rectangle_id(id, &full, Some(&mut summary.dedup))
            .unwrap()
            .map(|origin| origin.ad)
    };
    assert_eq!(map(0), Some(10));
    assert_eq!(map(0), Some(11));
    assert_eq!(map(0), None);
    assert_eq!(map(1), Some(12));
    assert_eq!(map(5), None);

    summary.dedup.reset_claims();
    assert_eq!(
        processor
            .map_rectangle_id(0, &full, Some(&mut summary.dedup))
            .unwrap(),
        Some(Origin {
            ad: 10,
            port: 0,
            port_number: 0
        })
    );

    assert_eq!(
        processor
            .unmap_classad_id(13, &full, Some(&summary.dedup))
            .unwrap()
            .to_vec(),
        vec![1]
    );
    assert!(
        processor
            .unmap_classad_id(99, &full, Some(&summary.dedup))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_map_rectangle_ids_without_summary() {
    let mut rects = machines();
    let mut processor = indexed(&rects);
    let origin = processor.map_rectangle_id(1, &rects, None).unwrap();
    assert_eq!(
        origin,
        Some(Origin {
            ad: 101,
            port: 1,
            port_number: 0
        })
    );
    assert_eq!(processor.map_rectangle_id(1, &rects, None).unwrap(), origin);
    assert_eq!(
        processor.unmap_classad_id(102, &rects, None).unwrap().to_vec(),
        vec![2]
    );

    processor.purge_rectangle(1, &mut rects, None).unwrap();
    assert_eq!(processor.map_rectangle_id(1, &rects, None).unwrap(), None);
    assert!(processor.unmap_classad_id(101, &rects, None).unwrap().is_empty());
}

#[test]
fn test_malformed_summary_rolls_back() {
    let (full, summary) = summarized();
    let mut processor = QueryProcessor::default();
    processor.initialize_indexes(&full, Some(&summary)).unwrap();

    let mut broken = summary.clone();
    broken.dedup.assign(1, 9);
    let err = processor
        .initialize_indexes(&full, Some(&broken))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
    assert!(processor.live().is_empty());
    assert!(!processor.is_summarized());
    assert!(processor.index(MEMORY, Direction::Exported).is_none());

    let mut broken = summary;
    broken.dedup.representatives.insert(5);
    assert!(processor.initialize_indexes(&full, Some(&broken)).is_err());
}
