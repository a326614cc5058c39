use std::collections::BTreeSet;

use pvb_codecs::VarIntG8iuBlock;
use pvb_common::ErrorKind;
use pvb_index::{
    DocumentEnumerator, OptIndex, OptVbIndex, PostingList, UniformVbIndex, create_index,
    verify_collection,
};
use pvb_sequence::{BuildConfig, GlobalParameters, SequenceFormat};
use pvb_testkit::{
    data_gen::{CollectionSpec, generate_collection},
    files::reload_index,
};

fn collection(seed: u64) -> anyhow::Result<(CollectionSpec, Vec<PostingList>)> {
    let spec = CollectionSpec::default()
        .with_num_docs(50_000)
        .with_num_terms(24)
        .with_lengths(1, 4_000)
        .with_seed(seed);
    let lists = generate_collection(&spec)?;
    Ok((spec, lists))
}

fn intersect<D: SequenceFormat, F: SequenceFormat>(
    a: &mut DocumentEnumerator<'_, D, F>,
    b: &mut DocumentEnumerator<'_, D, F>,
    num_docs: u64,
) -> Vec<u64> {
    let mut out = Vec::new();
    a.reset();
    b.reset();
    while a.docid() < num_docs {
        b.next_geq(a.docid());
        if b.docid() >= num_docs {
            break;
        }
        if b.docid() == a.docid() {
            out.push(a.docid());
            a.next();
        } else {
            a.next_geq(b.docid());
        }
    }
    out
}

#[test]
fn test_build_and_verify() -> anyhow::Result<()> {
    let (spec, lists) = collection(1)?;
    let params = GlobalParameters::default();
    let config = BuildConfig::default().with_worker_threads(2);
    let (index, stats): (OptVbIndex, _) = create_index(spec.num_docs, &lists, &params, &config)?;
    assert_eq!(stats.terms, lists.len());
    assert_eq!(
        stats.postings,
        lists.iter().map(|l| l.len() as u64).sum::<u64>()
    );
    assert_eq!(stats.docs_bits, index.docs_bits());
    assert!(stats.docs_bits_per_posting() < 32.0);
    verify_collection(&index, &lists)?;

    let reloaded = reload_index(&index)?;
    verify_collection(&reloaded, &lists)?;
    Ok(())
}

#[test]
fn test_worker_threads_do_not_change_the_index() -> anyhow::Result<()> {
    let (spec, lists) = collection(2)?;
    let params = GlobalParameters::default();
    let build = |threads: usize| -> anyhow::Result<Vec<u8>> {
        let config = BuildConfig::default()
            .with_worker_threads(threads)
            .with_eps3(0.01);
        let (index, _): (OptIndex<VarIntG8iuBlock>, _) =
            create_index(spec.num_docs, &lists, &params, &config)?;
        Ok(index.to_bytes()?)
    };
    let inline = build(0)?;
    assert_eq!(build(1)?, inline);
    assert_eq!(build(4)?, inline);
    Ok(())
}

#[test]
fn test_uniform_partitions() -> anyhow::Result<()> {
    let (spec, lists) = collection(3)?;
    let params = GlobalParameters::default().with_log_partition_size(6);
    let config = BuildConfig::default().with_worker_threads(0);
    let (index, _): (UniformVbIndex, _) = create_index(spec.num_docs, &lists, &params, &config)?;
    verify_collection(&index, &lists)?;
    Ok(())
}

#[test]
fn test_verification_reports_mismatch() -> anyhow::Result<()> {
    let (spec, mut lists) = collection(4)?;
    let params = GlobalParameters::default();
    let config = BuildConfig::default().with_worker_threads(0);
    let (index, _): (OptVbIndex, _) = create_index(spec.num_docs, &lists, &params, &config)?;

    let last = lists[5].len() - 1;
    lists[5].freqs[last] += 1;
    let err = verify_collection(&index, &lists).unwrap_err();
    match err.kind() {
        ErrorKind::VerificationMismatch {
            term,
            position,
            field,
            ..
        } => {
            assert_eq!(*term, 5);
            assert_eq!(*position, last as u64);
            assert_eq!(*field, "freq");
        }
        other => panic!("unexpected error {other}"),
    }
    lists[5].freqs[last] -= 1;

    lists.push(PostingList::new(vec![1], vec![1]));
    let err = verify_collection(&index, &lists).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::VerificationMismatch {
            field: "term count",
            ..
        }
    ));
    lists.truncate(lists.len() - 2);
    assert!(verify_collection(&index, &lists).is_err());
    Ok(())
}

#[test]
fn test_intersections() -> anyhow::Result<()> {
    let (spec, lists) = collection(5)?;
    let params = GlobalParameters::default();
    let config = BuildConfig::default().with_worker_threads(2);
    let (index, _): (OptVbIndex, _) = create_index(spec.num_docs, &lists, &params, &config)?;

    for (x, y) in [(0usize, 1usize), (2, 3), (4, 10), (7, 7), (20, 23)] {
        let expected = {
            let a = lists[x].docs.iter().copied().collect::<BTreeSet<_>>();
            let b = lists[y].docs.iter().copied().collect::<BTreeSet<_>>();
            a.intersection(&b).map(|&d| d as u64).collect::<Vec<_>>()
        };
        let mut a = index.get(x)?;
        let mut b = index.get(y)?;
        assert_eq!(intersect(&mut a, &mut b, spec.num_docs), expected);
    }
    Ok(())
}

#[test]
fn test_rejects_docid_outside_collection() {
    let params = GlobalParameters::default();
    let config = BuildConfig::default().with_worker_threads(0);
    let lists = vec![PostingList::new(vec![3, 10], vec![1, 2])];
    let result: pvb_common::Result<(OptVbIndex, _)> = create_index(10, &lists, &params, &config);
    assert!(result.is_err());
}
