use kb_core::config::EmbeddingSettings;
use kb_core::traits::Embedder;
use kb_embed::{load_embedder, FakeEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, ..EmbeddingSettings::default() };
    let embedder = load_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 1024);

    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    let (v1, v2) = (&embs[0], &embs[1]);
    assert_eq!(v1.len(), 1024, "embedding dim is 1024");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn query_embedding_matches_batch_embedding() {
    let embedder = FakeEmbedder::new(64);
    let q = embedder.embed_query("pump pressure").unwrap();
    let b = embedder.embed_batch(&["pump pressure".to_string()]).unwrap();
    assert_eq!(q, b[0]);
}

#[test]
fn shared_words_are_more_similar() {
    let embedder = FakeEmbedder::new(256);
    let v = embedder
        .embed_batch(&[
            "replace the water pump seal".to_string(),
            "water pump seal replacement".to_string(),
            "banana bread recipe".to_string(),
        ])
        .unwrap();
    assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
}

#[test]
fn blank_text_still_yields_unit_vector() {
    let v = FakeEmbedder::new(8).embed_query("   ").unwrap();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-6);
}
