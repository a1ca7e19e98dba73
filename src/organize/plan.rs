use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{resolve_with, OrganizeOptions};
use crate::models::{PlannedMove, RenamePlan, SkippedImage};
use crate::naming::FilenameGenerator;
use crate::pipeline::FlyerAnalysis;

/// Computes a [`RenamePlan`] without touching the filesystem.
pub struct Planner {
    options: OrganizeOptions,
    generator: FilenameGenerator,
}

impl Planner {
    pub fn new(options: OrganizeOptions, generator: FilenameGenerator) -> Self {
        Self { options, generator }
    }

    /// Plan a batch.
    ///
    /// With a destination, each flyer goes to `dest/{category_id}/{subcategory}`;
    /// otherwise it is renamed in place. Targets are checked against files on
    /// disk and against targets claimed earlier in the same plan, so no two
    /// moves share a target.
    pub fn plan(&self, analyses: &[FlyerAnalysis], destination: Option<&Path>) -> RenamePlan {
        let mut plan = RenamePlan {
            destination: destination.map(Path::to_path_buf),
            ..Default::default()
        };
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for analysis in analyses {
            let image = &analysis.image;
            let already_named =
                self.options.skip_generated && self.generator.is_generated(image.stem());

            let target_dir = match destination {
                Some(dest) => dest
                    .join(&analysis.classification.category_id)
                    .join(&analysis.classification.subcategory),
                None if already_named => {
                    plan.skipped.push(SkippedImage {
                        path: image.path.clone(),
                        reason: "already has a generated name".to_string(),
                    });
                    continue;
                }
                None => image.parent().to_path_buf(),
            };

            let file_name = if already_named {
                image.file_name.as_str()
            } else {
                analysis.proposed_name.as_str()
            };

            let wanted = target_dir.join(file_name);
            let target = if wanted == image.path && !claimed.contains(&wanted) {
                wanted
            } else {
                resolve_with(&target_dir, file_name, self.options.suffix, |path| {
                    claimed.contains(path) || (path != image.path.as_path() && path.exists())
                })
            };

            debug!("Planned {} -> {}", image.path.display(), target.display());
            claimed.insert(target.clone());
            plan.moves.push(PlannedMove {
                source: image.path.clone(),
                target,
                classification: analysis.classification.clone(),
                text: analysis.best_text.clone(),
            });
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, ImageFile, MatchSource};
    use crate::naming::NamingOptions;
    use crate::organize::SuffixStyle;
    use crate::rules::RuleSet;
    use tempfile::TempDir;

    fn planner() -> Planner {
        let rules = RuleSet::embedded().unwrap();
        Planner::new(
            OrganizeOptions::default(),
            FilenameGenerator::new(NamingOptions::default(), &rules),
        )
    }

    fn analysis(path: &Path, subcategory: &str, proposed: &str) -> FlyerAnalysis {
        FlyerAnalysis {
            image: ImageFile::from_path(path).unwrap(),
            attempts: Vec::new(),
            best_text: String::new(),
            classification: Classification {
                category_id: "10_Generico".to_string(),
                category: "Generico".to_string(),
                subcategory: subcategory.to_string(),
                keyword: None,
                source: MatchSource::Fallback,
            },
            proposed_name: proposed.to_string(),
        }
    }

    #[test]
    fn test_identical_names_get_distinct_targets() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("IMG_1.png");
        let b = dir.path().join("IMG_2.png");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let plan = planner().plan(
            &[
                analysis(&a, "outros", "outros.png"),
                analysis(&b, "outros", "outros.png"),
            ],
            None,
        );

        assert_eq!(plan.moves.len(), 2);
        assert_eq!(plan.moves[0].target, dir.path().join("outros.png"));
        assert_eq!(plan.moves[1].target, dir.path().join("outros (1).png"));
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn test_existing_file_is_not_a_target() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("IMG_1.png");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(dir.path().join("outros.png"), b"old").unwrap();

        let plan = planner().plan(&[analysis(&a, "outros", "outros.png")], None);
        assert_eq!(plan.moves[0].target, dir.path().join("outros (1).png"));
    }

    #[test]
    fn test_generated_names_skipped_in_place() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("outros_flyer.png");
        std::fs::write(&a, b"a").unwrap();

        let plan = planner().plan(&[analysis(&a, "outros", "outros.png")], None);
        assert!(plan.moves.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_destination_layout_keeps_generated_name() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("organizado");
        let a = dir.path().join("outros_flyer.png");
        std::fs::write(&a, b"a").unwrap();

        let plan = planner().plan(&[analysis(&a, "outros", "outros.png")], Some(&dest));
        assert_eq!(
            plan.moves[0].target,
            dest.join("10_Generico").join("outros").join("outros_flyer.png")
        );
    }

    #[test]
    fn test_file_already_at_target_is_noop() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("Promo.png");
        std::fs::write(&a, b"a").unwrap();

        let planner = Planner::new(
            OrganizeOptions {
                suffix: SuffixStyle::Underscore,
                ..Default::default()
            },
            FilenameGenerator::new(NamingOptions::default(), &RuleSet::embedded().unwrap()),
        );
        let plan = planner.plan(&[analysis(&a, "outros", "Promo.png")], None);
        assert!(plan.moves[0].is_noop());
        assert_eq!(plan.changes().count(), 0);
    }
}
