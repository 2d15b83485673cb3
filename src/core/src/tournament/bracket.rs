/// Standard single-elimination seed order for a bracket of `size` (a power
/// of two): the returned list is the first-round slot order, so adjacent
/// entries meet and the top two seeds can only meet in the final.
pub fn bracket_seed_order(size: usize) -> Vec<usize> {
    debug_assert!(size.is_power_of_two());

    let mut order = vec![1usize];

    while order.len() < size {
        let next_size = order.len() * 2;
        let mut next = Vec::with_capacity(next_size);
        for seed in &order {
            next.push(*seed);
            next.push(next_size + 1 - seed);
        }
        order = next;
    }

    order
}

/// First-round pairings for teams listed strongest first. Returns
/// (home, away) per match with the higher seed at home.
pub fn first_round_pairs(teams_by_seed: &[u32]) -> Vec<(u32, u32)> {
    let order = bracket_seed_order(teams_by_seed.len());

    order
        .chunks(2)
        .map(|pair| {
            let high = teams_by_seed[pair[0] - 1];
            let low = teams_by_seed[pair[1] - 1];
            (high, low)
        })
        .collect()
}

/// Winners of one round paired for the next, preserving bracket order.
pub fn next_round_pairs(winners: &[u32]) -> Vec<(u32, u32)> {
    winners
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Rounds a bracket of `size` runs: 8 -> 3 (QF, SF, F).
pub fn round_count(size: usize) -> u8 {
    size.trailing_zeros() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_team_seed_order_protects_top_seeds() {
        assert_eq!(vec![1, 8, 4, 5, 2, 7, 3, 6], bracket_seed_order(8));
    }

    #[test]
    fn four_and_sixteen_orders_are_consistent() {
        assert_eq!(vec![1, 4, 2, 3], bracket_seed_order(4));

        let sixteen = bracket_seed_order(16);
        assert_eq!(16, sixteen.len());
        assert_eq!(1, sixteen[0]);
        assert_eq!(16, sixteen[1]);
        // Seeds 1 and 2 land in opposite halves.
        let one = sixteen.iter().position(|&s| s == 1).unwrap();
        let two = sixteen.iter().position(|&s| s == 2).unwrap();
        assert!(one < 8 && two >= 8);
    }

    #[test]
    fn first_round_pairs_match_high_to_low() {
        let teams: Vec<u32> = (101..=108).collect(); // 101 is seed 1
        let pairs = first_round_pairs(&teams);

        assert_eq!((101, 108), pairs[0]);
        assert_eq!((104, 105), pairs[1]);
        assert_eq!(4, pairs.len());
    }

    #[test]
    fn round_counts() {
        assert_eq!(2, round_count(4));
        assert_eq!(3, round_count(8));
        assert_eq!(4, round_count(16));
    }
}
