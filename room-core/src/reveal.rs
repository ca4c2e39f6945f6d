use rand::Rng;
use rand::seq::SliceRandom;
use room_types::Player;

/// Occurrences that publicly revealing `letters` would add to `target.revealed`.
///
/// Every distinct letter requested is revealed in full: `count - existing`
/// copies, zero when it is absent or already public. The length of the result is
/// the newly revealed count that letter rewards are computed from.
pub fn reveal_occurrences(target: &Player, letters: &[char]) -> Vec<char> {
    let mut seen = Vec::new();
    let mut added = Vec::new();
    for &letter in letters {
        if seen.contains(&letter) {
            continue;
        }
        seen.push(letter);
        let missing = target
            .occurrences(letter)
            .saturating_sub(target.revealed_count(letter));
        added.extend(std::iter::repeat_n(letter, missing));
    }
    added
}

/// Distinct letters of the word with no public occurrence yet.
pub fn unseen_distinct_letters(target: &Player) -> Vec<char> {
    let mut letters = Vec::new();
    for ch in target.word.chars() {
        if !letters.contains(&ch) && target.revealed_count(ch) == 0 {
            letters.push(ch);
        }
    }
    letters
}

pub fn pick_unrevealed(target: &Player, rng: &mut impl Rng) -> Option<char> {
    target.unrevealed_letters().choose(rng).copied()
}

/// Up to `n` distinct unrevealed letters chosen at random.
pub fn pick_unrevealed_many(target: &Player, n: usize, rng: &mut impl Rng) -> Vec<char> {
    target
        .unrevealed_letters()
        .choose_multiple(rng, n)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player_with(word: &str, revealed: &[char]) -> Player {
        let mut player = Player::new("t", "T", 0);
        player.word = word.to_string();
        player.revealed = revealed.to_vec();
        player
    }

    #[test]
    fn test_reveal_counts_every_missing_occurrence() {
        let target = player_with("banana", &['a']);
        assert_eq!(reveal_occurrences(&target, &['a']), vec!['a', 'a']);
        assert_eq!(reveal_occurrences(&target, &['n', 'n']), vec!['n', 'n']);
        assert!(reveal_occurrences(&target, &['z']).is_empty());
    }

    #[test]
    fn test_unseen_distinct_letters() {
        let target = player_with("ghost", &['o']);
        assert_eq!(unseen_distinct_letters(&target), vec!['g', 'h', 's', 't']);
    }

    #[test]
    fn test_pick_unrevealed_many_is_distinct() {
        let target = player_with("letter", &[]);
        let mut rng = StdRng::seed_from_u64(7);
        let picked = pick_unrevealed_many(&target, 2, &mut rng);

        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0], picked[1]);
        assert!(picked.iter().all(|c| target.word.contains(*c)));
    }

    #[test]
    fn test_pick_unrevealed_none_when_solved() {
        let target = player_with("abc", &['a', 'b', 'c']);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_unrevealed(&target, &mut rng), None);
    }
}
