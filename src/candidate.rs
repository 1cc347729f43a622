use crate::oracle::{Availability, ExistenceOracle};
use crate::payload::MintTemplate;
use crate::sampler::IdSampler;
use log::info;
use rand::Rng;

/// Finds up to `target` unminted payloads with ids from `[start, end]`.
///
/// Each slot keeps drawing ids until the oracle reports one as available.
/// Taken and unknown ids are both skipped. Once the id pool runs dry the
/// remaining slots stay empty, so the result can be shorter than `target`.
/// Returns the data encodings in discovery order.
pub async fn build_candidates<O, R>(
    oracle: &O,
    template: &MintTemplate,
    (start, end): (u64, u64),
    target: usize,
    rng: &mut R,
) -> Vec<String>
where
    O: ExistenceOracle,
    R: Rng + ?Sized,
{
    let mut sampler = IdSampler::new(start, end);
    let mut found = Vec::with_capacity(target);

    for _ in 0..target {
        while let Some(id) = sampler.draw(rng) {
            let payload = template.render(id);
            if let Availability::Available(encoded) = oracle.check(&payload).await {
                found.push(encoded);
                break;
            }
        }
    }

    info!("now tx id {:?}", found);
    found
}
