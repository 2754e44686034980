// Row kernel shared by the reference and host-stream backends.
//
// Every output element is accumulated from zero in ascending k order, so
// backends that split the work by rows produce bit-identical results.

/// Computes one output row: `c_row = a_row @ b`, where `b` is `[k, n]`
/// row-major and `a_row.len() == k`.
pub fn matmul_row(a_row: &[f64], b: &[f64], n: usize, c_row: &mut [f64]) {
    debug_assert_eq!(c_row.len(), n);
    debug_assert_eq!(b.len(), a_row.len() * n);

    c_row.fill(0.0);
    for (p, &a) in a_row.iter().enumerate() {
        let b_row = &b[p * n..(p + 1) * n];
        for (c, &bv) in c_row.iter_mut().zip(b_row) {
            *c += a * bv;
        }
    }
}

/// Sequential `c = a @ b` over row-major buffers of shapes
/// `[m, k] @ [k, n] -> [m, n]`.
pub fn matmul_into(a: &[f64], b: &[f64], k: usize, n: usize, c: &mut [f64]) {
    if n == 0 {
        return;
    }
    if k == 0 {
        c.fill(0.0);
        return;
    }
    for (a_row, c_row) in a.chunks_exact(k).zip(c.chunks_exact_mut(n)) {
        matmul_row(a_row, b, n, c_row);
    }
}
