//! Built-in fallback content: the generic sample arrays served when the model
//! cannot be reached, and a subject-aware question bank.
//!
//! Everything here is pure. The same inputs always produce the same output.

use serde_json::json;

use crate::domain::{Difficulty, Essay, MultipleChoice, QuestionItem, QuestionType, ShortAnswer, TrueFalse};

/// Returned when the prompt does not name a known question type.
pub const GENERIC_FALLBACK_TEXT: &str = "Fallback content generation activated.";

/// Sample JSON array for whichever question type the prompt asks for.
/// The output parses as a JSON array whenever a type keyword matched.
pub fn fallback_text(prompt: &str, reason: &str) -> String {
  tracing::warn!(target: "generation", %reason, "Using fallback content generation");

  let kind = QuestionType::ALL.into_iter().find(|k| prompt.contains(k.prompt_keyword()));
  let items = match kind {
    Some(QuestionType::MultipleChoice) => json!([
      {"question": "What is the capital of France?", "options": ["London", "Berlin", "Paris", "Madrid"], "answer": "Paris"},
      {"question": "Which planet is known as the Red Planet?", "options": ["Venus", "Mars", "Jupiter", "Saturn"], "answer": "Mars"},
      {"question": "What is the largest mammal on Earth?", "options": ["Elephant", "Blue Whale", "Giraffe", "Polar Bear"], "answer": "Blue Whale"},
      {"question": "Which element has the chemical symbol 'O'?", "options": ["Gold", "Oxygen", "Osmium", "Oganesson"], "answer": "Oxygen"},
      {"question": "Who wrote 'Romeo and Juliet'?", "options": ["Charles Dickens", "Jane Austen", "William Shakespeare", "Mark Twain"], "answer": "William Shakespeare"}
    ]),
    Some(QuestionType::TrueFalse) => json!([
      {"question": "The Earth is flat.", "answer": false},
      {"question": "Water boils at 100 degrees Celsius at sea level.", "answer": true},
      {"question": "Humans have 206 bones in their body.", "answer": true},
      {"question": "The Great Wall of China is visible from space with the naked eye.", "answer": false},
      {"question": "The Sun revolves around the Earth.", "answer": false}
    ]),
    Some(QuestionType::ShortAnswer) => json!([
      {"question": "What is the chemical symbol for water?", "answer": "H2O"},
      {"question": "Who wrote Romeo and Juliet?", "answer": "William Shakespeare"},
      {"question": "What is photosynthesis?", "answer": "Photosynthesis is the process by which green plants and some other organisms use sunlight to synthesize foods with carbon dioxide and water."},
      {"question": "What is the capital of Japan?", "answer": "Tokyo"},
      {"question": "What is the law of conservation of energy?", "answer": "The law of conservation of energy states that energy cannot be created or destroyed, only transformed from one form to another."}
    ]),
    Some(QuestionType::Essay) => json!([
      {"question": "Discuss the causes and effects of climate change.", "guidelines": "Include scientific evidence and potential solutions."},
      {"question": "Analyze the themes in a novel of your choice.", "guidelines": "Focus on character development, setting, and symbolism."},
      {"question": "Compare and contrast renewable and non-renewable energy sources.", "guidelines": "Consider environmental impact, cost, and sustainability."},
      {"question": "Explain the importance of biodiversity in ecosystems.", "guidelines": "Discuss the consequences of biodiversity loss and conservation strategies."},
      {"question": "Evaluate the impact of social media on modern society.", "guidelines": "Consider both positive and negative effects on communication, mental health, and information sharing."}
    ]),
    None => return GENERIC_FALLBACK_TEXT.to_string(),
  };
  items.to_string()
}

type McSeed = (&'static str, [&'static str; 4], &'static str);

const MATHEMATICS_MC: &[McSeed] = &[
  ("What is the derivative of f(x) = x²?", ["f'(x) = x", "f'(x) = 2x", "f'(x) = 2", "f'(x) = x²"], "f'(x) = 2x"),
  ("Which of the following is a prime number?", ["15", "21", "57", "23"], "23"),
  ("What is the value of π (pi) to two decimal places?", ["3.14", "3.41", "3.12", "3.16"], "3.14"),
];

const PHYSICS_MC: &[McSeed] = &[
  ("What is the SI unit of force?", ["Watt", "Joule", "Newton", "Pascal"], "Newton"),
  (
    "Which law of motion states that for every action, there is an equal and opposite reaction?",
    ["First law", "Second law", "Third law", "Fourth law"],
    "Third law",
  ),
  ("What is the speed of light in vacuum?", ["3 × 10⁸ m/s", "3 × 10⁶ m/s", "3 × 10⁷ m/s", "3 × 10⁹ m/s"], "3 × 10⁸ m/s"),
];

const COMPUTER_SCIENCE_MC: &[McSeed] = &[
  ("Which data structure operates on a LIFO principle?", ["Queue", "Stack", "Linked List", "Tree"], "Stack"),
  (
    "What does CPU stand for?",
    ["Central Processing Unit", "Computer Processing Unit", "Central Program Unit", "Central Processor Unit"],
    "Central Processing Unit",
  ),
  ("Which of the following is not a programming paradigm?", ["Object-Oriented", "Functional", "Procedural", "Systematic"], "Systematic"),
];

const MATHEMATICS_TF: &[(&str, bool)] = &[
  ("The sum of the angles in a triangle is 180 degrees.", true),
  ("Every even number greater than 2 is a prime number.", false),
];
const PHYSICS_TF: &[(&str, bool)] = &[
  ("The acceleration due to gravity on Earth is approximately 9.8 m/s².", true),
  ("Sound travels faster in air than in water.", false),
];
const COMPUTER_SCIENCE_TF: &[(&str, bool)] = &[
  ("HTML is a programming language.", false),
  ("Binary code consists of 0s and 1s.", true),
];

const MATHEMATICS_SA: &[(&str, &str)] = &[
  ("What is the formula for the area of a circle?", "A = πr²"),
  ("Define what a prime number is.", "A prime number is a natural number greater than 1 that is not a product of two smaller natural numbers."),
];
const PHYSICS_SA: &[(&str, &str)] = &[
  (
    "State Newton's First Law of Motion.",
    "An object at rest stays at rest and an object in motion stays in motion with the same speed and in the same direction unless acted upon by an unbalanced force.",
  ),
  ("What is the formula for kinetic energy?", "KE = (1/2)mv²"),
];
const COMPUTER_SCIENCE_SA: &[(&str, &str)] = &[
  ("What does API stand for?", "Application Programming Interface"),
  (
    "Explain what a variable is in programming.",
    "A variable is a named storage location in a program that contains data which can be modified during program execution.",
  ),
];

const MATHEMATICS_ESSAY: &[(&str, &str)] = &[
  ("Explain the importance of calculus in real-world applications.", "Include examples from physics, engineering, and economics."),
  (
    "Discuss the historical development of geometry and its impact on modern mathematics.",
    "Consider contributions from different civilizations and time periods.",
  ),
];
const PHYSICS_ESSAY: &[(&str, &str)] = &[
  (
    "Analyze the implications of Einstein's Theory of Relativity on our understanding of space and time.",
    "Discuss both Special and General Relativity.",
  ),
  ("Evaluate the potential of renewable energy sources to replace fossil fuels.", "Consider technological, economic, and environmental factors."),
];
const COMPUTER_SCIENCE_ESSAY: &[(&str, &str)] = &[
  ("Discuss the ethical implications of artificial intelligence in society.", "Consider privacy, employment, and decision-making concerns."),
  (
    "Analyze the evolution of programming languages and their impact on software development.",
    "Include examples of how different paradigms have shaped modern programming.",
  ),
];

fn multiple_choice_pool(subject: &str, topics: &[String]) -> Vec<MultipleChoice> {
  let table = match subject {
    "Mathematics" => Some(MATHEMATICS_MC),
    "Physics" => Some(PHYSICS_MC),
    "Computer Science" => Some(COMPUTER_SCIENCE_MC),
    _ => None,
  };
  if let Some(rows) = table {
    return rows
      .iter()
      .map(|(q, opts, a)| MultipleChoice {
        question: q.to_string(),
        options: opts.iter().map(|o| o.to_string()).collect(),
        answer: a.to_string(),
      })
      .collect();
  }

  let topic = topics.first().map(String::as_str).unwrap_or("general knowledge");
  vec![
    MultipleChoice {
      question: format!("Question about {} related to {}", subject, topic),
      options: ["Option A", "Option B", "Option C", "Option D"].iter().map(|o| o.to_string()).collect(),
      answer: "Option B".into(),
    },
    MultipleChoice {
      question: format!("Another question about {}", subject),
      options: ["First choice", "Second choice", "Third choice", "Fourth choice"].iter().map(|o| o.to_string()).collect(),
      answer: "Third choice".into(),
    },
  ]
}

fn true_false_pool(subject: &str, topics: &[String]) -> Vec<TrueFalse> {
  let table = match subject {
    "Mathematics" => Some(MATHEMATICS_TF),
    "Physics" => Some(PHYSICS_TF),
    "Computer Science" => Some(COMPUTER_SCIENCE_TF),
    _ => None,
  };
  if let Some(rows) = table {
    return rows.iter().map(|(q, a)| TrueFalse { question: q.to_string(), answer: *a }).collect();
  }

  let first = topics.first().map(String::as_str);
  vec![
    TrueFalse {
      question: format!("True or False: {} is related to {}.", subject, first.unwrap_or("science")),
      answer: true,
    },
    TrueFalse {
      question: format!("True or False: {} was discovered in the 21st century.", first.unwrap_or(subject)),
      answer: false,
    },
  ]
}

fn short_answer_pool(subject: &str, topics: &[String]) -> Vec<ShortAnswer> {
  let table = match subject {
    "Mathematics" => Some(MATHEMATICS_SA),
    "Physics" => Some(PHYSICS_SA),
    "Computer Science" => Some(COMPUTER_SCIENCE_SA),
    _ => None,
  };
  if let Some(rows) = table {
    return rows.iter().map(|(q, a)| ShortAnswer { question: q.to_string(), answer: a.to_string() }).collect();
  }

  let first = topics.first().map(String::as_str);
  let focus = first.unwrap_or(subject);
  vec![
    ShortAnswer {
      question: format!("Briefly explain the importance of {}.", focus),
      answer: format!("{} is important because it helps us understand and solve problems in the field.", focus),
    },
    ShortAnswer {
      question: format!("Define the term \"{}\" as it relates to {}.", first.unwrap_or("key concept"), subject),
      answer: format!("The term refers to a fundamental concept in {} that helps explain various phenomena.", subject),
    },
  ]
}

fn essay_pool(subject: &str, topics: &[String]) -> Vec<Essay> {
  let table = match subject {
    "Mathematics" => Some(MATHEMATICS_ESSAY),
    "Physics" => Some(PHYSICS_ESSAY),
    "Computer Science" => Some(COMPUTER_SCIENCE_ESSAY),
    _ => None,
  };
  if let Some(rows) = table {
    return rows
      .iter()
      .map(|(q, g)| Essay { question: q.to_string(), guidelines: Some(g.to_string()) })
      .collect();
  }

  let first = topics.first().map(String::as_str);
  vec![
    Essay {
      question: format!("Discuss the major developments in {} over the past century.", subject),
      guidelines: Some(format!(
        "Consider technological advancements, theoretical breakthroughs, and the impact on {}.",
        first.unwrap_or("the field")
      )),
    },
    Essay {
      question: format!(
        "Analyze the relationship between {} and {}.",
        first.unwrap_or(subject),
        topics.get(1).map(String::as_str).unwrap_or("related fields")
      ),
      guidelines: Some("Include historical context, current applications, and future possibilities.".into()),
    },
  ]
}

/// The bank entries for `T`, before cycling.
pub trait Banked: QuestionItem {
  fn pool(subject: &str, topics: &[String]) -> Vec<Self>;
}

impl Banked for MultipleChoice {
  fn pool(subject: &str, topics: &[String]) -> Vec<Self> { multiple_choice_pool(subject, topics) }
}
impl Banked for TrueFalse {
  fn pool(subject: &str, topics: &[String]) -> Vec<Self> { true_false_pool(subject, topics) }
}
impl Banked for ShortAnswer {
  fn pool(subject: &str, topics: &[String]) -> Vec<Self> { short_answer_pool(subject, topics) }
}
impl Banked for Essay {
  fn pool(subject: &str, topics: &[String]) -> Vec<Self> { essay_pool(subject, topics) }
}

/// `count` bank questions for `subject`, cycling through the pool by index.
/// Difficulty does not influence the bank; it is accepted so every fallback
/// path takes the same arguments as live generation.
pub fn fallback_question_bank<T: Banked>(
  count: usize,
  subject: &str,
  topics: &[String],
  _difficulty: Difficulty,
) -> Vec<T> {
  let pool = T::pool(subject, topics);
  (0..count).map(|i| pool[i % pool.len()].clone()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::extract::extract_json;

  fn topics(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn fallback_text_parses_for_every_type_keyword() {
    for kind in QuestionType::ALL {
      let prompt = format!("Generate 3 {} about History.", kind.prompt_keyword());
      let items = extract_json(&fallback_text(&prompt, "test")).expect("fallback json");
      assert_eq!(items.len(), 5, "{kind}");
    }
  }

  #[test]
  fn fallback_text_without_keyword_is_the_sentinel() {
    assert_eq!(fallback_text("Write a poem", "test"), GENERIC_FALLBACK_TEXT);
  }

  #[test]
  fn bank_is_deterministic() {
    let t = topics(&["Algebra", "Geometry"]);
    let a: Vec<MultipleChoice> = fallback_question_bank(7, "Mathematics", &t, Difficulty::Easy);
    let b: Vec<MultipleChoice> = fallback_question_bank(7, "Mathematics", &t, Difficulty::Easy);
    assert_eq!(a, b);
    let c: Vec<Essay> = fallback_question_bank(3, "Art", &t, Difficulty::Hard);
    let d: Vec<Essay> = fallback_question_bank(3, "Art", &t, Difficulty::Hard);
    assert_eq!(c, d);
  }

  #[test]
  fn bank_cycles_through_the_subject_pool() {
    let qs: Vec<MultipleChoice> = fallback_question_bank(4, "Physics", &topics(&["Mechanics"]), Difficulty::Medium);
    assert_eq!(qs.len(), 4);
    assert_eq!(qs[0].question, "What is the SI unit of force?");
    assert_eq!(qs[3], qs[0]);
    assert!(qs.iter().all(|q| q.is_well_formed()));
  }

  #[test]
  fn unknown_subject_uses_templates_with_first_topic() {
    let qs: Vec<TrueFalse> = fallback_question_bank(2, "Geography", &topics(&["Rivers"]), Difficulty::Easy);
    assert_eq!(qs[0].question, "True or False: Geography is related to Rivers.");
    assert_eq!(qs[1].question, "True or False: Rivers was discovered in the 21st century.");

    let sa: Vec<ShortAnswer> = fallback_question_bank(1, "Geography", &[], Difficulty::Easy);
    assert_eq!(sa[0].question, "Briefly explain the importance of Geography.");

    let essays: Vec<Essay> = fallback_question_bank(2, "Economics", &topics(&["Trade", "Tariffs"]), Difficulty::Easy);
    assert_eq!(essays[1].question, "Analyze the relationship between Trade and Tariffs.");
  }

  #[test]
  fn zero_count_is_empty() {
    let qs: Vec<ShortAnswer> = fallback_question_bank(0, "Physics", &[], Difficulty::Easy);
    assert!(qs.is_empty());
  }

  #[test]
  fn every_banked_multiple_choice_is_well_formed() {
    for subject in ["Mathematics", "Physics", "Computer Science", "Chemistry"] {
      let qs: Vec<MultipleChoice> = fallback_question_bank(3, subject, &topics(&["Topic"]), Difficulty::Medium);
      assert!(qs.iter().all(|q| q.is_well_formed()), "{subject}");
    }
  }
}
