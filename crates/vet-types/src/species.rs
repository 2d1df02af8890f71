use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a [`Species`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeciesError {
    /// The input did not name one of the supported species.
    #[error("unsupported species '{0}' (expected one of: Dog, Cat, Rabbit, Bird, Fish, Turtle, Hamster)")]
    Unsupported(String),
}

/// A species covered by the knowledge base.
///
/// The set is closed: disease profiles and queries for anything else are rejected. Parsing is
/// case-insensitive and accepts plurals plus a handful of everyday synonyms, so that
/// `"puppy"`, `"Dogs"` and `"canine"` all resolve to [`Species::Dog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Species {
    Dog,
    Cat,
    Rabbit,
    Bird,
    Fish,
    Turtle,
    Hamster,
}

impl Species {
    /// Every supported species, in display order.
    pub const ALL: [Species; 7] = [
        Species::Dog,
        Species::Cat,
        Species::Rabbit,
        Species::Bird,
        Species::Fish,
        Species::Turtle,
        Species::Hamster,
    ];

    /// Canonical display form, e.g. `"Dog"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Dog => "Dog",
            Species::Cat => "Cat",
            Species::Rabbit => "Rabbit",
            Species::Bird => "Bird",
            Species::Fish => "Fish",
            Species::Turtle => "Turtle",
            Species::Hamster => "Hamster",
        }
    }

    /// Lower-case plural used when rendering profiles as prose, e.g. `"dogs"`.
    pub fn plural(&self) -> &'static str {
        match self {
            Species::Dog => "dogs",
            Species::Cat => "cats",
            Species::Rabbit => "rabbits",
            Species::Bird => "birds",
            Species::Fish => "fish",
            Species::Turtle => "turtles",
            Species::Hamster => "hamsters",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = SpeciesError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let folded = input.trim().to_lowercase();
        let species = match folded.as_str() {
            "dog" | "dogs" | "canine" | "puppy" | "puppies" => Species::Dog,
            "cat" | "cats" | "feline" | "kitten" | "kittens" => Species::Cat,
            "rabbit" | "rabbits" | "bunny" | "bunnies" => Species::Rabbit,
            "bird" | "birds" | "parrot" | "parrots" | "budgie" | "budgies" | "parakeet"
            | "cockatiel" | "canary" => Species::Bird,
            "fish" | "fishes" | "goldfish" | "betta" => Species::Fish,
            "turtle" | "turtles" | "tortoise" | "tortoises" | "terrapin" => Species::Turtle,
            "hamster" | "hamsters" => Species::Hamster,
            _ => return Err(SpeciesError::Unsupported(input.trim().to_owned())),
        };
        Ok(species)
    }
}

impl serde::Serialize for Species {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Species {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
