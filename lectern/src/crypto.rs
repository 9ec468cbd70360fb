/// Hashes a password with SHA-256, returning the lowercase hex digest.
///
/// This is a transport-side obfuscation the platform's login and signup forms apply before
/// sending; it is not a password storage scheme.
pub fn hash_password(password: &str) -> String {
    sha256::digest(password)
}

#[test]
fn test_hash_password() {
    assert_eq!(
        hash_password(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(
        hash_password("password"),
        "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
    );
    let hashed = hash_password("hunter2");
    assert_eq!(hashed.len(), 64);
    assert!(hashed
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
}
