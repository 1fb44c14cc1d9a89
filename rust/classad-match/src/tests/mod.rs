mod purge_tests;
mod query_tests;

use classad_index::RecordId;
use classad_keyset::KeySet;

use crate::{AdId, Direction, QueryProcessor, Rectangles};

pub(crate) const MEMORY: &str = "n:Memory";
pub(crate) const OPSYS: &str = "s:OpSys";
pub(crate) const IMAGE_SIZE: &str = "n:ImageSize";

/// A job's requirements: minimum memory, operating system, and the image size it
/// offers to the machine.
pub(crate) type Job = (Option<f64>, Option<&'static str>, Option<f64>);

pub(crate) const BIG_IMAGE_SMALL_MEMORY: Job = (Some(1024.0), None, Some(1000.0));
pub(crate) const LINUX_SMALL_IMAGE: Job = (None, Some("LINUX"), Some(100.0));
pub(crate) const LINUX_NO_IMAGE: Job = (None, Some("LINUX"), None);
pub(crate) const HUGE_IMAGE: Job = (Some(1024.0), None, Some(4096.0));

/// Adds a machine offering `memory` and `opsys`, accepting images up to `max_image`.
pub(crate) fn add_machine(
    rects: &mut Rectangles,
    owner: AdId,
    memory: f64,
    opsys: &str,
    max_image: Option<f64>,
) -> RecordId {
    let r = rects.new_rectangle(owner);
    assert!(rects.add_exported_value(r, MEMORY, memory).unwrap());
    assert!(rects.add_exported_value(r, OPSYS, opsys).unwrap());
    if let Some(max_image) = max_image {
        assert!(
            rects
                .add_upper_bound(r, IMAGE_SIZE, max_image, false, Direction::Imported)
                .unwrap()
        );
    }
    r
}

/// Three machines:
///
/// - `0`: 2048 MB, LINUX, images up to 2048
/// - `1`: 8192 MB, WINDOWS, any image
/// - `2`: 512 MB, LINUX, images up to 256
pub(crate) fn machines() -> Rectangles {
    let mut rects = Rectangles::new();
    add_machine(&mut rects, 100, 2048.0, "LINUX", Some(2048.0));
    add_machine(&mut rects, 101, 8192.0, "WINDOWS", None);
    add_machine(&mut rects, 102, 512.0, "LINUX", Some(256.0));
    rects
}

pub(crate) fn add_job(window: &mut Rectangles, (memory, opsys, image): Job) -> RecordId {
    let r = window.new_rectangle(window.r_id());
    if let Some(memory) = memory {
        assert!(
            window
                .add_lower_bound(r, MEMORY, memory, false, Direction::Imported)
                .unwrap()
        );
    }
    if let Some(opsys) = opsys {
        assert!(
            window
                .add_lower_bound(r, OPSYS, opsys, false, Direction::Imported)
                .unwrap()
        );
        assert!(
            window
                .add_upper_bound(r, OPSYS, opsys, false, Direction::Imported)
                .unwrap()
        );
    }
    if let Some(image) = image {
        assert!(window.add_exported_value(r, IMAGE_SIZE, image).unwrap());
    }
    r
}

pub(crate) fn window(jobs: &[Job]) -> Rectangles {
    let mut window = Rectangles::new();
    for &job in jobs {
        add_job(&mut window, job);
    }
    window
}

pub(crate) fn indexed(rects: &Rectangles) -> QueryProcessor {
    let mut processor = QueryProcessor::default();
    processor.initialize_indexes(rects, None).unwrap();
    processor
}

pub(crate) fn run(processor: &mut QueryProcessor, window: &Rectangles) -> Vec<u32> {
    let mut result = KeySet::new();
    processor.do_query(window, &mut result).unwrap();
    result.to_vec()
}
