use compact_genome::interface::alphabet::Alphabet;
use log::info;

use crate::config::MsaConfig;
use crate::distance::kmer_distance_matrix;
use crate::ensemble::ensemble_alignment;
use crate::error::Result;
use crate::guide_tree::GuideTree;
use crate::msa::Msa;
use crate::progressive::progressive_alignment;
use crate::refinement::refine;
use crate::sequence::SequenceCollection;

/// Aligns a sequence collection under the given configuration.
///
/// Input validation happens eagerly, before any matrix is allocated. The
/// run is either the single pipeline (distance estimation, guide tree,
/// progressive alignment, refinement) or, when an ensemble is configured,
/// multiple perturbed pipelines with a consensus step. Either way it
/// completes wholesale; no partial alignment is ever returned.
pub fn align<AlphabetType: Alphabet + Sync>(
    collection: &SequenceCollection<AlphabetType>,
    config: &MsaConfig<AlphabetType>,
) -> Result<Msa<AlphabetType>>
where
    AlphabetType::CharacterType: Send + Sync,
{
    config.verify()?;
    collection.ensure_alignable()?;

    match &config.ensemble {
        Some(ensemble) => ensemble_alignment(collection, config, ensemble),
        None => {
            let distances =
                kmer_distance_matrix(collection, config.kmer_length, config.distance_entry_budget)?;
            let tree = GuideTree::build(&distances);
            let initial = progressive_alignment(collection, &tree, &config.scores)?;
            let (refined, objective) = refine(
                initial,
                &tree,
                &config.scores,
                config.refinement_iteration_limit,
            )?;
            info!("Alignment finished with objective {objective}");

            Msa::from_profile(&refined, collection)
        }
    }
}
