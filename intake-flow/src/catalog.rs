//! Localized prompt catalog.
//!
//! Every lookup takes an explicit [`Language`]. The only place a default
//! language is picked is [`Language::default`], applied once when a session
//! or record has nothing stored yet.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::applicant::Applicant;
use crate::step::{Markup, Outbound};

/// Languages the bot speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
    Uz,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Ru, Language::Uz];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
            Language::Uz => "uz",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "ru" => Some(Language::Ru),
            "uz" => Some(Language::Uz),
            _ => None,
        }
    }

    /// Label shown on the language picker button.
    pub fn label(self) -> &'static str {
        match self {
            Language::En => "🇬🇧 English",
            Language::Ru => "🇷🇺 Русский",
            Language::Uz => "🇺🇿 O'zbekcha",
        }
    }

    /// Resolves a picker answer. Accepts the button label or the bare code.
    pub fn from_choice(input: &str) -> Option<Self> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.label() == input)
            .or_else(|| Language::from_code(input))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Single-text catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    SelectLanguage,
    MainMenu,
    ContactUs,
    AskName,
    InvalidName,
    AskAge,
    InvalidAge,
    AskGender,
    AskBenefits,
    AskResponsibility,
    InvalidResponsibility,
    ApplicationSubmitted,
    Accepted,
    Rejected,
}

/// Option-list catalog entries, rendered as keyboard buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choices {
    /// Apply, contact us, change language.
    MainMenu,
    Genders,
    /// Yes first, then no.
    YesNo,
}

pub fn text(prompt: Prompt, lang: Language) -> &'static str {
    use Language::*;
    match (prompt, lang) {
        (Prompt::SelectLanguage, En) => "🇬🇧 Please select your language.",
        (Prompt::SelectLanguage, Ru) => "🇷🇺 Пожалуйста, выберите ваш язык.",
        (Prompt::SelectLanguage, Uz) => "🇺🇿 Iltimos, tilingizni tanlang.",

        (Prompt::MainMenu, En) => "🏠 Please choose an option:",
        (Prompt::MainMenu, Ru) => "🏠 Пожалуйста, выберите опцию:",
        (Prompt::MainMenu, Uz) => "🏠 Iltimos, variantni tanlang:",

        (Prompt::ContactUs, En) => "📞 You can contact us at: +998901234567",
        (Prompt::ContactUs, Ru) => "📞 Вы можете связаться с нами по номеру: +998901234567",
        (Prompt::ContactUs, Uz) => {
            "📞 Biz bilan ushbu raqam orqali bog'lanishingiz mumkin: +998901234567"
        }

        (Prompt::AskName, En) => "👤 What is your full name?",
        (Prompt::AskName, Ru) => "👤 Как вас зовут (полное имя)?",
        (Prompt::AskName, Uz) => "👤 To'liq ismingiz nima?",

        (Prompt::InvalidName, En) => "❌ Invalid name. Please enter your full name.",
        (Prompt::InvalidName, Ru) => "❌ Неверное имя. Пожалуйста, введите ваше полное имя.",
        (Prompt::InvalidName, Uz) => "❌ Noto'g'ri ism. Iltimos, to'liq ismingizni kiriting.",

        (Prompt::AskAge, En) => "🎂 How old are you?",
        (Prompt::AskAge, Ru) => "🎂 Сколько вам лет?",
        (Prompt::AskAge, Uz) => "🎂 Yoshingiz nechada?",

        (Prompt::InvalidAge, En) => "❌ Invalid age. Please enter a number.",
        (Prompt::InvalidAge, Ru) => "❌ Неверный возраст. Пожалуйста, введите число.",
        (Prompt::InvalidAge, Uz) => "❌ Noto'g'ri yosh. Iltimos, raqam kiriting.",

        (Prompt::AskGender, En) => "🚻 What is your gender?",
        (Prompt::AskGender, Ru) => "🚻 Ваш пол?",
        (Prompt::AskGender, Uz) => "🚻 Jinsingiz nima?",

        (Prompt::AskBenefits, En) => {
            "Do you have any other additional benefits? Please describe them."
        }
        (Prompt::AskBenefits, Ru) => {
            "У вас есть какие-либо другие дополнительные льготы? Пожалуйста, опишите их."
        }
        (Prompt::AskBenefits, Uz) => {
            "Boshqa qo'shimcha imtiyozlaringiz bormi? Iltimos, ularni tasvirlab bering."
        }

        (Prompt::AskResponsibility, En) => "🏃‍♂️ Are you quick and responsible?",
        (Prompt::AskResponsibility, Ru) => "🏃‍♂️ Вы быстрый и ответственный?",
        (Prompt::AskResponsibility, Uz) => "🏃‍♂️ Siz tez va mas'uliyatlimisiz?",

        (Prompt::InvalidResponsibility, En) => {
            "❌ Invalid answer. Please select one of the options."
        }
        (Prompt::InvalidResponsibility, Ru) => {
            "❌ Неверный ответ. Пожалуйста, выберите один из вариантов."
        }
        (Prompt::InvalidResponsibility, Uz) => {
            "❌ Noto'g'ri javob. Iltimos, variantlardan birini tanlang."
        }

        (Prompt::ApplicationSubmitted, En) => {
            "✅ Your application has been submitted successfully! We will contact you soon."
        }
        (Prompt::ApplicationSubmitted, Ru) => {
            "✅ Ваша заявка успешно отправлена! Мы свяжемся с вами в ближайшее время."
        }
        (Prompt::ApplicationSubmitted, Uz) => {
            "✅ Arizangiz muvaffaqiyatli yuborildi! Tez orada siz bilan bog'lanamiz."
        }

        (Prompt::Accepted, En) => "✅ Congratulations! Your application has been accepted.",
        (Prompt::Accepted, Ru) => "✅ Поздравляем! Ваша заявка принята.",
        (Prompt::Accepted, Uz) => "✅ Tabriklaymiz! Sizning arizangiz qabul qilindi.",

        (Prompt::Rejected, En) => {
            "❌ We regret to inform you that your application has been rejected."
        }
        (Prompt::Rejected, Ru) => "❌ С сожалением сообщаем, что ваша заявка отклонена.",
        (Prompt::Rejected, Uz) => "❌ Afsuski, sizning arizangiz rad etildi.",
    }
}

pub fn options(choices: Choices, lang: Language) -> &'static [&'static str] {
    use Language::*;
    match (choices, lang) {
        (Choices::MainMenu, En) => &["📝 Apply for a job", "📞 Contact us", "🌐 Language"],
        (Choices::MainMenu, Ru) => &["📝 Подать заявку", "📞 Связаться с нами", "🌐 Язык"],
        (Choices::MainMenu, Uz) => &["📝 Ishga ariza berish", "📞 Biz bilan bog'lanish", "🌐 Til"],

        (Choices::Genders, En) => &["👨 Male", "👩 Female"],
        (Choices::Genders, Ru) => &["👨 Мужской", "👩 Женский"],
        (Choices::Genders, Uz) => &["👨 Erkak", "👩 Ayol"],

        (Choices::YesNo, En) => &["✅ Yes", "❌ No"],
        (Choices::YesNo, Ru) => &["✅ Да", "❌ Нет"],
        (Choices::YesNo, Uz) => &["✅ Ha", "❌ Yo'q"],
    }
}

/// Matches a yes/no answer against the closed option set of `lang` only.
///
/// Returns `Some(true)` for the first option, `Some(false)` for the second and
/// `None` for anything else, including the same answer in another language.
pub fn responsibility_answer(input: &str, lang: Language) -> Option<bool> {
    let yes_no = options(Choices::YesNo, lang);
    if input == yes_no[0] {
        Some(true)
    } else if input == yes_no[1] {
        Some(false)
    } else {
        None
    }
}

fn buttons(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

pub fn language_picker(lang: Language) -> Outbound {
    Outbound::new(text(Prompt::SelectLanguage, lang)).with_markup(Markup::Keyboard {
        rows: vec![Language::ALL.iter().map(|l| l.label().to_string()).collect()],
        one_time: true,
    })
}

pub fn main_menu(lang: Language) -> Outbound {
    let labels = options(Choices::MainMenu, lang);
    Outbound::new(text(Prompt::MainMenu, lang)).with_markup(Markup::Keyboard {
        rows: vec![buttons(&labels[..1]), buttons(&labels[1..])],
        one_time: false,
    })
}

pub fn gender_picker(lang: Language) -> Outbound {
    Outbound::new(text(Prompt::AskGender, lang)).with_markup(Markup::Keyboard {
        rows: vec![buttons(options(Choices::Genders, lang))],
        one_time: true,
    })
}

pub fn responsibility_picker(lang: Language) -> Outbound {
    Outbound::new(text(Prompt::AskResponsibility, lang)).with_markup(Markup::Keyboard {
        rows: vec![buttons(options(Choices::YesNo, lang))],
        one_time: true,
    })
}

struct SummaryLabels {
    title: &'static str,
    username: &'static str,
    name: &'static str,
    age: &'static str,
    gender: &'static str,
    benefits: &'static str,
    responsible: &'static str,
    yes: &'static str,
    no: &'static str,
}

fn summary_labels(lang: Language) -> SummaryLabels {
    match lang {
        Language::En => SummaryLabels {
            title: "📝 New Job Application:",
            username: "Username",
            name: "👤 Name",
            age: "🎂 Age",
            gender: "🚻 Gender",
            benefits: "➕ Additional Benefits",
            responsible: "🏃‍♂️ Quick & Responsible",
            yes: "Yes",
            no: "No",
        },
        Language::Ru => SummaryLabels {
            title: "📝 Новая заявка на работу:",
            username: "Имя пользователя",
            name: "👤 Имя",
            age: "🎂 Возраст",
            gender: "🚻 Пол",
            benefits: "➕ Дополнительные льготы",
            responsible: "🏃‍♂️ Быстрый и ответственный",
            yes: "Да",
            no: "Нет",
        },
        Language::Uz => SummaryLabels {
            title: "📝 Yangi ish arizasi:",
            username: "Foydalanuvchi nomi",
            name: "👤 Ism",
            age: "🎂 Yosh",
            gender: "🚻 Jins",
            benefits: "➕ Qo'shimcha imtiyozlar",
            responsible: "🏃‍♂️ Tezkor va mas'uliyatli",
            yes: "Ha",
            no: "Yo'q",
        },
    }
}

/// Reviewer-facing summary of a submitted application.
pub fn reviewer_summary(applicant: &Applicant, lang: Language) -> String {
    let labels = summary_labels(lang);
    let blank = "-";
    let responsible = match applicant.quick_and_responsible {
        Some(true) => labels.yes,
        Some(false) => labels.no,
        None => blank,
    };
    let username = applicant
        .display_name
        .as_deref()
        .map(|name| format!("@{name}"))
        .unwrap_or_else(|| blank.to_string());
    let age = applicant
        .age
        .map(|age| age.to_string())
        .unwrap_or_else(|| blank.to_string());

    format!(
        "{}\n\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}: {}",
        labels.title,
        labels.username,
        username,
        labels.name,
        applicant.full_name.as_deref().unwrap_or(blank),
        labels.age,
        age,
        labels.gender,
        applicant.gender.as_deref().unwrap_or(blank),
        labels.benefits,
        applicant.additional_benefits.as_deref().unwrap_or(blank),
        labels.responsible,
        responsible,
    )
}
