/// decode a native-endian `f64` from exactly 8 bytes. Shorter slices are zero padded.
pub(crate) fn bytes_to_float(bytes: &[u8]) -> f64 {
    let mut arr = [0; 8];
    bytes
        .iter()
        .take(8)
        .enumerate()
        .for_each(|(idx, value)| arr[idx] = *value);
    f64::from_ne_bytes(arr)
}

/// decode a native-endian `i32` from exactly 4 bytes. Shorter slices are zero padded.
pub(crate) fn bytes_to_int(bytes: &[u8]) -> i32 {
    let mut arr = [0; 4];
    bytes
        .iter()
        .take(4)
        .enumerate()
        .for_each(|(idx, value)| arr[idx] = *value);
    i32::from_ne_bytes(arr)
}

/// decode a buffer of packed native-endian `f64` values into `out`
pub(crate) fn decode_floats(bytes: &[u8], out: &mut [f64]) {
    bytes
        .chunks_exact(8)
        .zip(out.iter_mut())
        .for_each(|(chunk, value)| *value = bytes_to_float(chunk));
}

#[test]
fn float_round_trip() {
    let values = [1.5, -0.0, f64::MAX, 1e-300];
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();

    let mut out = [0.0; 4];
    decode_floats(&bytes, &mut out);

    assert_eq!(values, out);
    assert_eq!(bytes_to_int(&(-7i32).to_ne_bytes()), -7);
}
