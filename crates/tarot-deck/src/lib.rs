use rand::Rng;
use rand::seq::SliceRandom;
use tarot_api_types::{Card, Orientation};
use thiserror::Error;

pub const SPREAD_SIZE: usize = 3;

const MAJOR_ARCANA: [&str; 22] = [
    "The Fool",
    "The Magician",
    "The High Priestess",
    "The Empress",
    "The Emperor",
    "The Hierophant",
    "The Lovers",
    "The Chariot",
    "Strength",
    "The Hermit",
    "Wheel of Fortune",
    "Justice",
    "The Hanged Man",
    "Death",
    "Temperance",
    "The Devil",
    "The Tower",
    "The Star",
    "The Moon",
    "The Sun",
    "Judgement",
    "The World",
];

const SUITS: [&str; 4] = ["Wands", "Cups", "Swords", "Pentacles"];

const RANKS: [&str; 14] = [
    "Ace", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Page", "Knight",
    "Queen", "King",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("a spread needs exactly {SPREAD_SIZE} cards, got {0}")]
    SpreadSize(usize),
    #[error("deck has {0} cards, fewer than a spread")]
    DeckTooSmall(usize),
}

/// The full 78-card deck, majors first, every card upright.
pub fn tarot_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(MAJOR_ARCANA.len() + SUITS.len() * RANKS.len());

    for (number, name) in MAJOR_ARCANA.iter().enumerate() {
        deck.push(Card {
            id: number as u32,
            name: (*name).to_owned(),
            image: format!("major/{number:02}-{}.jpg", slug(name)),
            orientation: Orientation::Upright,
        });
    }

    for suit in SUITS {
        for (rank_index, rank) in RANKS.iter().enumerate() {
            deck.push(Card {
                id: deck.len() as u32,
                name: format!("{rank} of {suit}"),
                image: format!("minor/{}-{:02}.jpg", slug(suit), rank_index + 1),
                orientation: Orientation::Upright,
            });
        }
    }

    deck
}

fn slug(name: &str) -> String {
    name.to_ascii_lowercase().replace(' ', "-")
}

/// Shuffle `deck`, keep the first three and give each an independent coin-flip orientation.
pub fn draw_spread<R: Rng + ?Sized>(deck: &[Card], rng: &mut R) -> Result<DrawnSet, DeckError> {
    if deck.len() < SPREAD_SIZE {
        return Err(DeckError::DeckTooSmall(deck.len()));
    }

    let mut pool = deck.to_vec();
    let (picked, _) = pool.partial_shuffle(rng, SPREAD_SIZE);
    let cards: Vec<Card> = picked
        .iter()
        .cloned()
        .map(|mut card| {
            card.orientation = if rng.gen_bool(0.5) {
                Orientation::Reversed
            } else {
                Orientation::Upright
            };
            card
        })
        .collect();

    DrawnSet::face_down(cards)
}

/// Three cards plus their face-up flags. Flags only ever turn on left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnSet {
    cards: [Card; SPREAD_SIZE],
    revealed: [bool; SPREAD_SIZE],
}

impl DrawnSet {
    pub fn face_down(cards: Vec<Card>) -> Result<Self, DeckError> {
        let len = cards.len();
        let cards: [Card; SPREAD_SIZE] = cards.try_into().map_err(|_| DeckError::SpreadSize(len))?;
        Ok(Self {
            cards,
            revealed: [false; SPREAD_SIZE],
        })
    }

    pub fn face_up(cards: Vec<Card>) -> Result<Self, DeckError> {
        let mut set = Self::face_down(cards)?;
        set.reveal_all();
        Ok(set)
    }

    pub fn cards(&self) -> &[Card; SPREAD_SIZE] {
        &self.cards
    }

    pub fn revealed(&self) -> [bool; SPREAD_SIZE] {
        self.revealed
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().take_while(|flag| **flag).count()
    }

    pub fn all_revealed(&self) -> bool {
        self.revealed_count() == SPREAD_SIZE
    }

    /// Flip card `index` face up. Refused unless it is the leftmost face-down card.
    pub fn reveal(&mut self, index: usize) -> bool {
        if index >= SPREAD_SIZE || index != self.revealed_count() {
            return false;
        }
        self.revealed[index] = true;
        true
    }

    pub fn reveal_all(&mut self) {
        self.revealed = [true; SPREAD_SIZE];
    }

    pub fn to_vec(&self) -> Vec<Card> {
        self.cards.to_vec()
    }
}
