use chrono::NaiveDate;

use crate::{auth::User, error::FormError, task::NewTask};

/// Raw input of the add-task form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub date: Option<NaiveDate>,
}

/// Checks the form in a fixed order and stops at the first failure.
pub fn validate(
    form: &TaskForm,
    user: Option<&User>,
    today: NaiveDate,
) -> Result<NewTask, FormError> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(FormError::MissingTitle);
    }

    let description = form.description.trim();
    if description.is_empty() {
        return Err(FormError::MissingDescription);
    }

    let date = form.date.ok_or(FormError::MissingDate)?;
    if date < today {
        return Err(FormError::PastDate);
    }

    let user = user.ok_or(FormError::NotAuthenticated)?;

    Ok(NewTask {
        title: title.to_string(),
        description: description.to_string(),
        date,
        user_id: user.uid.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn user() -> User {
        User {
            uid: "123".to_string(),
            email: "ann@example.com".to_string(),
        }
    }

    fn form(title: &str, description: &str, date: Option<NaiveDate>) -> TaskForm {
        TaskForm {
            title: title.to_string(),
            description: description.to_string(),
            date,
        }
    }

    #[test]
    fn empty_title_is_rejected() {
        let err = validate(&form("", "Some description", Some(today())), Some(&user()), today())
            .unwrap_err();
        assert_eq!(err.to_string(), "Task title is required.");
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = validate(&form("   ", "Some description", Some(today())), Some(&user()), today())
            .unwrap_err();
        assert_eq!(err, FormError::MissingTitle);
    }

    #[test]
    fn empty_description_is_rejected() {
        let err =
            validate(&form("Some title", "", Some(today())), Some(&user()), today()).unwrap_err();
        assert_eq!(err.to_string(), "Task description is required.");
    }

    #[test]
    fn missing_date_is_rejected() {
        let err = validate(&form("Some title", "Some description", None), Some(&user()), today())
            .unwrap_err();
        assert_eq!(err.to_string(), "Please select a date for the task.");
    }

    #[test]
    fn past_date_is_rejected() {
        let yesterday = today().pred_opt().unwrap();
        let err = validate(
            &form("Some title", "Some description", Some(yesterday)),
            Some(&user()),
            today(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot select past date. Please choose correct date."
        );
    }

    #[test]
    fn missing_user_is_rejected() {
        let err = validate(&form("Some title", "Some description", Some(today())), None, today())
            .unwrap_err();
        assert_eq!(err.to_string(), "User is not authenticated.");
    }

    #[test]
    fn first_failure_wins() {
        let err = validate(&form("", "", None), None, today()).unwrap_err();
        assert_eq!(err, FormError::MissingTitle);

        let err = validate(&form("Title", "", None), None, today()).unwrap_err();
        assert_eq!(err, FormError::MissingDescription);
    }

    #[test]
    fn valid_form_is_trimmed() {
        let tomorrow = today().succ_opt().unwrap();
        let task = validate(
            &form("  Buy milk ", "\tsemi-skimmed\n", Some(tomorrow)),
            Some(&user()),
            today(),
        )
        .unwrap();

        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "semi-skimmed");
        assert_eq!(task.date, tomorrow);
        assert_eq!(task.user_id, "123");
    }
}
