pub const DIVISION_MIN: u8 = 1;
pub const DIVISION_MAX: u8 = 8;

/// Ordered 24-symbol subdivision alphabet. When a division exhausts it,
/// labels continue as `alpha_2`, `beta_2`, and so on.
pub const SUBDIVISION_ALPHABET: [&str; 24] = [
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi",
    "psi", "omega",
];

/// Label for the n-th subdivision of a division (zero-based).
pub fn subdivision_label(index: usize) -> String {
    let symbol = SUBDIVISION_ALPHABET[index % SUBDIVISION_ALPHABET.len()];
    let cycle = index / SUBDIVISION_ALPHABET.len();

    if cycle == 0 {
        symbol.to_string()
    } else {
        format!("{}_{}", symbol, cycle + 1)
    }
}

/// Divisions 1-2 hold 16 teams per subdivision; 3-8 hold 8.
pub fn subdivision_capacity(division: u8) -> usize {
    if division <= 2 {
        16
    } else {
        8
    }
}
