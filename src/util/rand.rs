use rand::SeedableRng;
use rand_distr::{num_traits::PrimInt, Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscreteDistribution<I: PrimInt> {
    /// A max-exclusive uniform distribution in the range [min, max).
    Uniform {
        min: I,
        max: I,
    },
    Always {
        value: I,
    },
}

impl<I> Distribution<I> for DiscreteDistribution<I>
where
    I: PrimInt + rand_distr::uniform::SampleUniform,
{
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> I {
        match self {
            DiscreteDistribution::Uniform { min, max } => rng.sample(Uniform::new(min, max)),
            DiscreteDistribution::Always { value } => *value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rng {
    rng: Xoshiro256PlusPlus,
}

impl Rng {
    #[must_use]
    pub fn from_seed(seed: u64) -> Rng {
        Rng {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    pub fn sample<R>(&mut self, dist: &impl Distribution<R>) -> R {
        dist.sample(&mut self.rng)
    }
}
