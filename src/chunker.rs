/// Yield successive `size`-sized chunks from `items`.
///
/// Order is preserved within and across chunks. Every chunk holds exactly `size`
/// items except the last one, which holds the remainder. An empty input yields
/// no chunks at all.
pub fn chunks<T>(items: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    assert!(size > 0, "chunk size must be positive");
    items.chunks(size)
}

#[test]
fn test_chunks_remainder_goes_last() {
    let items = [1, 2, 3, 4, 5, 6, 7];
    let got: Vec<&[i32]> = chunks(&items, 3).collect();
    assert_eq!(got, vec![&[1, 2, 3][..], &[4, 5, 6][..], &[7][..]]);
}

#[test]
fn test_chunks_empty_input() {
    let items: [u8; 0] = [];
    assert_eq!(chunks(&items, 50).count(), 0);
}
