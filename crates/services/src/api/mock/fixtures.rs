use portal_core::model::{
    Announcement, Course, CourseCategory, CourseStatus, Discipline, Lesson, LessonKind, Material,
    MaterialKind, Module, User, UserRole,
};

/// Password accepted for every seeded account.
pub const DEFAULT_PASSWORD: &str = "123456";

/// Code accepted by the password-recovery token check.
pub const RECOVERY_CODE: &str = "123456";

/// Canned data served by `MockApi`.
#[derive(Debug, Clone)]
pub struct Fixtures {
    pub users: Vec<User>,
    /// `(cpf, password)` pairs that may log in.
    pub credentials: Vec<(String, String)>,
    pub courses: Vec<Course>,
    pub announcements: Vec<Announcement>,
}

impl Default for Fixtures {
    fn default() -> Self {
        let users = vec![
            User {
                id: "1".into(),
                name: "João Silva".into(),
                email: "student@portal.example".into(),
                cpf: "123.456.789-00".into(),
                role: UserRole::Student,
                avatar: Some("https://api.dicebear.com/7.x/avataaars/svg?seed=joao".into()),
                study_time: Some("2-4h".into()),
                study_shift: Some("evening".into()),
                study_preference: Some("video".into()),
            },
            User {
                id: "2".into(),
                name: "Maria Santos".into(),
                email: "teacher@portal.example".into(),
                cpf: "987.654.321-00".into(),
                role: UserRole::Teacher,
                avatar: Some("https://api.dicebear.com/7.x/avataaars/svg?seed=maria".into()),
                study_time: None,
                study_shift: None,
                study_preference: None,
            },
            User {
                id: "3".into(),
                name: "Portal Admin".into(),
                email: "admin@portal.example".into(),
                cpf: "111.222.333-44".into(),
                role: UserRole::Admin,
                avatar: None,
                study_time: None,
                study_shift: None,
                study_preference: None,
            },
        ];
        let credentials = users
            .iter()
            .map(|u| (u.cpf.clone(), DEFAULT_PASSWORD.to_string()))
            .collect();

        Self {
            users,
            credentials,
            courses: vec![bar_exam_course(), public_exams_course()],
            announcements: announcements(),
        }
    }
}

fn lesson(id: &str, title: &str, kind: LessonKind, duration: u32, order: u32) -> Lesson {
    Lesson {
        id: id.into(),
        title: title.into(),
        description: format!("{title} overview"),
        kind,
        duration,
        video_url: matches!(kind, LessonKind::Video)
            .then(|| format!("https://videos.portal.example/{id}.mp4")),
        completed: false,
        order,
        published_at: "2025-01-10".into(),
        materials: Vec::new(),
    }
}

fn bar_exam_course() -> Course {
    let mut intro = lesson("101", "Constitutional principles", LessonKind::Video, 45, 1);
    intro.materials.push(Material {
        id: "m-101".into(),
        title: "Principles handout".into(),
        kind: MaterialKind::Pdf,
        url: "https://files.portal.example/m-101.pdf".into(),
        size: "1.2 MB".into(),
    });

    Course {
        id: "1".into(),
        title: "Bar Exam - First Phase".into(),
        description: "Complete preparation for the first phase of the bar exam.".into(),
        category: CourseCategory::BarExamFirstPhase,
        workload_hours: 120,
        progress: 35,
        status: CourseStatus::Active,
        start_date: "2025-01-06".into(),
        end_date: Some("2025-06-30".into()),
        thumbnail: "https://images.portal.example/courses/1.jpg".into(),
        teacher: "Maria Santos".into(),
        modules: vec![Module {
            id: "mod-1".into(),
            title: "Public law".into(),
            description: "Constitutional and administrative law".into(),
            order: 1,
            disciplines: vec![
                Discipline {
                    id: "disc-1".into(),
                    title: "Constitutional law".into(),
                    description: "Foundations".into(),
                    order: 1,
                    lessons: vec![
                        intro,
                        lesson("102", "Fundamental rights", LessonKind::Video, 50, 2),
                    ],
                },
                Discipline {
                    id: "disc-2".into(),
                    title: "Administrative law".into(),
                    description: "Public administration".into(),
                    order: 2,
                    lessons: vec![
                        lesson("103", "Administrative acts", LessonKind::Material, 20, 1),
                        lesson("104", "Live review", LessonKind::Live, 90, 2),
                    ],
                },
            ],
        }],
    }
}

fn public_exams_course() -> Course {
    Course {
        id: "2".into(),
        title: "Public Service Exams".into(),
        description: "Core subjects for public service exams.".into(),
        category: CourseCategory::PublicExams,
        workload_hours: 80,
        progress: 0,
        status: CourseStatus::Active,
        start_date: "2025-02-03".into(),
        end_date: None,
        thumbnail: "https://images.portal.example/courses/2.jpg".into(),
        teacher: "Maria Santos".into(),
        modules: vec![Module {
            id: "mod-2".into(),
            title: "Portuguese".into(),
            description: "Grammar and interpretation".into(),
            order: 1,
            disciplines: vec![Discipline {
                id: "disc-3".into(),
                title: "Grammar".into(),
                description: "Syntax essentials".into(),
                order: 1,
                lessons: vec![lesson("201", "Sentence structure", LessonKind::Video, 40, 1)],
            }],
        }],
    }
}

fn announcements() -> Vec<Announcement> {
    vec![
        Announcement {
            id: "1".into(),
            title: "Welcome to the portal!".into(),
            content: "Explore the platform and make the most of your courses.".into(),
            published_at: "2025-01-10".into(),
            pinned: true,
            course_id: None,
        },
        Announcement {
            id: "2".into(),
            title: "New mock exam available".into(),
            content: "The first-phase mock exam is open in the mock exams area.".into(),
            published_at: "2025-01-18".into(),
            pinned: true,
            course_id: Some("1".into()),
        },
        Announcement {
            id: "3".into(),
            title: "Scheduled maintenance".into(),
            content: "The system will be offline on 01/25 from 00:00 to 04:00.".into(),
            published_at: "2025-01-20".into(),
            pinned: false,
            course_id: None,
        },
    ]
}
