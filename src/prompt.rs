use crate::models::LessonPlanInput;

/// Sections the model is asked to produce, in order.
pub const LESSON_SECTIONS: [&str; 6] = [
    "Introduction and Hook",
    "Main Activities",
    "Assessment Strategies",
    "Closure",
    "Extensions and Modifications",
    "Assessment Questions",
];

/// Builds the generation prompt. `notes` is intentionally left out.
pub fn build_prompt(input: &LessonPlanInput) -> String {
    let sections = LESSON_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate a detailed lesson plan based on the following information:\n\
        \n\
        Topic: {topic}\n\
        Grade Level: {grade}\n\
        Main Concept & Subtopics: {concept}\n\
        Materials Needed: {materials}\n\
        Learning Objectives: {objectives}\n\
        Lesson Outline: {outline}\n\
        \n\
        Please provide a structured lesson plan that includes:\n\
        {sections}\n\
        \n\
        Format the response with clear sections and bullet points.",
        topic = input.topic,
        grade = input.grade_level,
        concept = input.main_concept,
        materials = input.materials,
        objectives = input.objectives,
        outline = input.outline,
    )
}
