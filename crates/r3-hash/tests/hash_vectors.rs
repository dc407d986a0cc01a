use r3_hash::{hash_file, hash_str, Hasher};

#[test]
fn sha256_empty_string() {
    assert_eq!(
        hash_str(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn sha256_hello_world() {
    assert_eq!(
        hash_str("hello world"),
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
}

#[test]
fn streaming_matches_oneshot() {
    let data = b"the quick brown fox jumps over the lazy dog";
    let mut oneshot = Hasher::new();
    oneshot.update(data);

    let mut streamed = Hasher::new();
    for chunk in data.chunks(7) {
        streamed.update(chunk);
    }

    assert_eq!(oneshot.finalize(), streamed.finalize());
}

#[test]
fn write_trait() {
    use std::io::Write;

    let mut expected = Hasher::new();
    expected.update(b"hello world");

    let mut hasher = Hasher::new();
    hasher.write_all(b"hello world").unwrap();

    assert_eq!(expected.finalize(), hasher.finalize());
}

#[test]
fn hash_file_matches_hash_str_for_same_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();
    assert_eq!(hash_file(&path).unwrap(), hash_str("a,b,c\n1,2,3\n"));
}
