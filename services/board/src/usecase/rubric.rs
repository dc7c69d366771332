use bboard_domain::form::FormErrors;

use crate::domain::repository::RubricRepository;
use crate::domain::types::{Rubric, RubricGroup, SubRubric, group_by_super, sub_rubrics};
use crate::domain::validate::{self, RUBRIC_NAME_MAX};
use crate::error::BoardServiceError;

pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Sub-rubrics grouped under their super-rubric, in menu order.
pub struct NavigationUseCase<R>
where
    R: RubricRepository,
{
    pub rubrics: R,
}

impl<R> NavigationUseCase<R>
where
    R: RubricRepository,
{
    pub async fn execute(&self) -> Result<Vec<RubricGroup>, BoardServiceError> {
        let all = self.rubrics.list().await?;
        Ok(group_by_super(sub_rubrics(&all)))
    }
}

/// Look up one sub-rubric together with its parent.
pub async fn find_sub_rubric<R>(rubrics: &R, id: i32) -> Result<SubRubric, BoardServiceError>
where
    R: RubricRepository,
{
    let all = rubrics.list().await?;
    sub_rubrics(&all)
        .into_iter()
        .find(|s| s.id == id)
        .ok_or(BoardServiceError::RubricNotFound)
}

#[derive(Debug, Clone, Default)]
pub struct CreateRubricInput {
    pub name: String,
    pub order: i16,
    /// Name of the parent super-rubric. `None` creates a super-rubric.
    pub parent: Option<String>,
}

pub struct CreateRubricUseCase<R>
where
    R: RubricRepository,
{
    pub rubrics: R,
}

impl<R> CreateRubricUseCase<R>
where
    R: RubricRepository,
{
    /// Create a super-rubric, or a sub-rubric under an existing super-rubric.
    pub async fn execute(&self, input: CreateRubricInput) -> Result<Rubric, BoardServiceError> {
        let mut errors = FormErrors::new();
        let name = validate::required_text(&mut errors, "name", &input.name, Some(RUBRIC_NAME_MAX));
        if !errors.has("name") && self.rubrics.find_by_name(name).await?.is_some() {
            errors.add("name", "Rubric with this Name already exists.");
        }

        let mut parent_id = None;
        if let Some(parent) = input.parent.as_deref() {
            match self.rubrics.find_by_name(parent.trim()).await? {
                Some(p) if p.is_super() => parent_id = Some(p.id),
                _ => errors.add("super_rubric", INVALID_CHOICE),
            }
        }
        errors.into_result()?;

        let rubric = self.rubrics.create(name, input.order, parent_id).await?;
        tracing::info!(rubric_id = rubric.id, name = %rubric.name, "rubric created");
        Ok(rubric)
    }
}
