use classad_keyset::KeySet;

use crate::{
    Query, QueryProcessor,
    tests::{
        BIG_IMAGE_SMALL_MEMORY, HUGE_IMAGE, LINUX_NO_IMAGE, LINUX_SMALL_IMAGE, indexed, machines,
        window,
    },
};

fn evaluate(processor: &mut QueryProcessor, query: &Query) -> Vec<u32> {
    let mut result = KeySet::new();
    query.run(processor, &mut result).unwrap();
    result.to_vec()
}

#[test]
fn test_combinators() {
    let rects = machines();
    let mut processor = indexed(&rects);
    let memory = window(&[BIG_IMAGE_SMALL_MEMORY]);
    let linux = window(&[LINUX_SMALL_IMAGE]);
    let huge = window(&[HUGE_IMAGE]);
    let nothing = window(&[LINUX_NO_IMAGE]);

    assert_eq!(evaluate(&mut processor, &Query::single(&memory)), vec![0, 1]);
    assert_eq!(
        evaluate(&mut processor, &Query::and(Query::single(&memory), Query::single(&linux))),
        vec![0]
    );
    assert_eq!(
        evaluate(&mut processor, &Query::or(Query::single(&memory), Query::single(&linux))),
        vec![0, 1, 2]
    );
    assert_eq!(
        evaluate(
            &mut processor,
            &Query::or(
                Query::and(Query::single(&memory), Query::single(&huge)),
                Query::single(&nothing)
            )
        ),
        vec![1]
    );
}

#[test]
fn test_or_accumulates_into_the_caller_result() {
    let rects = machines();
    let mut processor = indexed(&rects);
    let linux = window(&[LINUX_SMALL_IMAGE]);
    let huge = window(&[HUGE_IMAGE]);

    let mut result = KeySet::from_keys([9]);
    Query::or(Query::single(&linux), Query::single(&huge))
        .run(&mut processor, &mut result)
        .unwrap();
    assert_eq!(result.to_vec(), vec![0, 1, 2, 9]);

    // AND only adds its own intersection; earlier content is kept as is.
    let mut result = KeySet::from_keys([9]);
    Query::and(Query::single(&linux), Query::single(&huge))
        .run(&mut processor, &mut result)
        .unwrap();
    assert_eq!(result.to_vec(), vec![9]);
}
