// tests/ingest_merge.rs
use newsrank::ingest::types::{ArticleRecord, FetchOrigin};
use newsrank::{dedup_and_sort, normalize_and_merge, CanonicalArticle};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::collections::HashSet;

fn rec(url: &str, published_at: &str, origin: FetchOrigin) -> ArticleRecord {
    ArticleRecord {
        source: Some("Src".into()),
        title: Some(format!("title {url}")),
        url: Some(url.into()),
        published_at: Some(published_at.into()),
        fetched_from: Some(origin),
        ..Default::default()
    }
}

fn assert_newest_first(out: &[CanonicalArticle]) {
    for w in out.windows(2) {
        match (w[0].published_at_parsed, w[1].published_at_parsed) {
            (Some(a), Some(b)) => assert!(a >= b, "{a} before {b}"),
            (None, Some(_)) => panic!("null date sorted before a dated article"),
            _ => {}
        }
    }
}

#[test]
fn newest_duplicate_wins_and_null_sorts_last() {
    let newsapi = vec![rec("a", "2025-06-01", FetchOrigin::NewsApi)];
    let gdelt = vec![
        rec("a", "2025-06-05", FetchOrigin::Gdelt),
        rec("b", "", FetchOrigin::Gdelt),
    ];
    let out = normalize_and_merge(vec![newsapi, gdelt]);

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].url, "a");
    assert_eq!(out[0].published_at, "2025-06-05");
    assert_eq!(out[0].fetched_from, FetchOrigin::Gdelt);
    assert_eq!(out[1].url, "b");
    assert!(out[1].published_at_parsed.is_none());
}

#[test]
fn undated_duplicates_keep_first_in_concatenation_order() {
    let first = vec![rec("x", "not a date", FetchOrigin::NewsApi)];
    let second = vec![rec("x", "", FetchOrigin::Gdelt)];
    let out = normalize_and_merge(vec![first, second]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].fetched_from, FetchOrigin::NewsApi);
}

#[test]
fn records_without_url_are_dropped() {
    let recs = vec![
        ArticleRecord {
            title: Some("no url".into()),
            ..Default::default()
        },
        ArticleRecord {
            url: Some("   ".into()),
            ..Default::default()
        },
        rec("ok", "2025-01-01T00:00:00Z", FetchOrigin::NewsApi),
    ];
    let out = normalize_and_merge(vec![recs]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].url, "ok");
}

#[test]
fn missing_fields_default_to_empty() {
    let out = normalize_and_merge(vec![vec![ArticleRecord {
        url: Some("u".into()),
        ..Default::default()
    }]]);
    let a = &out[0];
    assert_eq!(a.source, "");
    assert_eq!(a.title, "");
    assert_eq!(a.description, "");
    assert_eq!(a.content, "");
    assert_eq!(a.fetched_from, FetchOrigin::Unknown);
    assert!(a.published_at_parsed.is_none());
}

#[test]
fn empty_input_is_empty_output() {
    assert!(normalize_and_merge(Vec::<Vec<ArticleRecord>>::new()).is_empty());
    assert!(normalize_and_merge(vec![vec![], vec![]]).is_empty());
}

/// Random mixes of duplicated urls, mixed date formats and garbage dates.
fn random_batches(rng: &mut StdRng) -> Vec<Vec<ArticleRecord>> {
    const DATES: [&str; 8] = [
        "2025-06-01T10:00:00Z",
        "2025-06-01 10:00:00",
        "2025-06-02",
        "20250603T080000Z",
        "Tue, 03 Jun 2025 09:00:00 +0000",
        "2025-06-04T01:02:03+02:00",
        "",
        "garbage",
    ];
    let n_batches = rng.random_range(1..4);
    (0..n_batches)
        .map(|b| {
            let n = rng.random_range(0..25);
            let mut batch: Vec<ArticleRecord> = (0..n)
                .map(|_| {
                    let url = format!("https://n.example/{}", rng.random_range(0..15));
                    let date = DATES[rng.random_range(0..DATES.len())];
                    let origin = if b % 2 == 0 {
                        FetchOrigin::NewsApi
                    } else {
                        FetchOrigin::Gdelt
                    };
                    rec(&url, date, origin)
                })
                .collect();
            batch.shuffle(&mut *rng);
            batch
        })
        .collect()
}

#[test]
fn merge_invariants_hold_on_random_input() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let batches = random_batches(&mut rng);
        let input_urls: HashSet<String> = batches
            .iter()
            .flatten()
            .filter_map(|r| r.url.clone())
            .collect();

        let out = normalize_and_merge(batches);

        // every url exactly once, none invented, none lost
        let out_urls: HashSet<&str> = out.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(out_urls.len(), out.len());
        assert_eq!(out_urls.len(), input_urls.len());

        assert_newest_first(&out);

        // idempotent, also when merged output is fed back in as raw records
        assert_eq!(dedup_and_sort(out.clone()), out);
        let reparsed: Vec<ArticleRecord> = out.clone().into_iter().map(Into::into).collect();
        assert_eq!(normalize_and_merge(vec![reparsed]), out);
    }
}

#[test]
fn winner_is_newest_copy_of_each_url() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let batches = random_batches(&mut rng);
        let all = normalize_and_merge(batches.clone().into_iter().map(|b| {
            // Keep every copy by making urls unique per position.
            b.into_iter()
                .enumerate()
                .map(|(i, mut r)| {
                    r.url = r.url.map(|u| format!("{u}#{i}"));
                    r
                })
                .collect::<Vec<_>>()
        }));
        let out = normalize_and_merge(batches);
        for a in &out {
            let newest = all
                .iter()
                .filter(|c| c.url.split('#').next() == Some(a.url.as_str()))
                .filter_map(|c| c.published_at_parsed)
                .max();
            assert_eq!(a.published_at_parsed, newest, "url {}", a.url);
        }
    }
}
