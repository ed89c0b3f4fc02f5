use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, HEAD_ALIAS, PARENT_REGEX};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::RepositoryError;
use anyhow::Context;

/// A revision expression naming a commit
///
/// Supported forms:
/// - Branch names: `main`, `feature/login`
/// - `HEAD`
/// - Full (40) or abbreviated (4-39) hex commit ids, tried when no branch of
///   that name exists
/// - Parent notation: `<revision>^`
/// - Ancestor notation: `<revision>~<n>`, following first parents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Ref(String),
    Parent(Box<Revision>),
    Ancestor(Box<Revision>, usize),
}

impl Revision {
    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else if revision.is_empty() {
            anyhow::bail!(RepositoryError::NoSuchCommit(revision.to_string()))
        } else {
            Ok(Revision::Ref(revision.to_string()))
        }
    }

    /// Parse and resolve `revision` to a commit id
    ///
    /// Anything that does not name a commit fails with `NoSuchCommit`.
    pub fn resolve_commit(revision: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        Self::try_parse(revision)?
            .resolve(repository)?
            .ok_or_else(|| RepositoryError::NoSuchCommit(revision.to_string()).into())
    }

    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<Option<ObjectId>> {
        match self {
            Revision::Ref(name) => Self::resolve_ref(name, repository),
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(base_revision.resolve(repository)?, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_ref(name: &str, repository: &Repository) -> anyhow::Result<Option<ObjectId>> {
        if name == HEAD_ALIAS {
            return repository.refs().read_head();
        }

        // branches win over ids that happen to look alike
        if let Ok(branch_name) = BranchName::try_parse(name.to_string())
            && let Some(oid) = repository.refs().read_branch(&branch_name)?
        {
            return Ok(Some(oid));
        }

        if Self::looks_like_oid(name) {
            return Self::resolve_oid(name, repository).map(Some);
        }

        Ok(None)
    }

    fn resolve_commit_parent(
        oid: Option<ObjectId>,
        repository: &Repository,
    ) -> anyhow::Result<Option<ObjectId>> {
        match oid {
            Some(oid) => Ok(repository.database().load_commit(&oid)?.parent().cloned()),
            None => Ok(None),
        }
    }

    fn resolve_oid(oid_str: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        let commit_matches = repository
            .database()
            .find_objects_by_prefix(oid_str)?
            .into_iter()
            .filter(|oid| {
                repository
                    .database()
                    .get_object_type(oid)
                    .map(|object_type| object_type == ObjectType::Commit)
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();

        match commit_matches.as_slice() {
            [] => anyhow::bail!(RepositoryError::NoSuchCommit(oid_str.to_string())),
            [oid] => Ok(oid.clone()),
            _ => anyhow::bail!(RepositoryError::AmbiguousCommit(oid_str.to_string())),
        }
    }

    fn looks_like_oid(s: &str) -> bool {
        s.len() >= 4 && s.len() <= 40 && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}
