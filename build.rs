fn main() {
    // GIT_COMMIT_HASH and friends end up in $OUT_DIR/built.rs
    built::write_built_file().expect("Failed to acquire build-time information");
}
