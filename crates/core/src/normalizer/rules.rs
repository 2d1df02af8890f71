//! Ordered keyword rules for free-text symptom phrases.
//!
//! Rules are tried top to bottom and the first matching pattern wins, so narrow patterns
//! must sit above broad ones. "tarry stool" has to reach `bloody_diarrhea` before the generic
//! stool rule turns it into `diarrhea`; "scratching at ears" has to reach `ear_scratching`
//! before the generic itch rule. Patterns run against folded (lower-cased, whitespace
//! collapsed) text.

use crate::vocabulary::Vocabulary;
use crate::{EngineError, EngineResult};
use regex::Regex;

/// The standard rule table as `(pattern, canonical key)` pairs, in evaluation order.
pub const STANDARD_RULES: &[(&str, &str)] = &[
    // Gastrointestinal: blood and obstruction signs before the generic stool/vomit rules.
    (r"\b(tarry|black)\s+(stool|poop|feces|faeces)", "bloody_diarrhea"),
    (r"\bblood(y)?\b.*\b(stool|poop|feces|faeces|diarrh)", "bloody_diarrhea"),
    (r"\b(stool|poop|feces|faeces|diarrh\w*)\b.*\bblood", "bloody_diarrhea"),
    (r"\bretch\w*|\bdry\s+heav\w*|\bunproductive\b|\bnothing\s+(comes|coming)\s+up", "unproductive_retching"),
    (r"\bbloat\w*|\bdistend\w*|\bswollen\s+(belly|abdomen|stomach|tummy)", "bloated_abdomen"),
    (r"\bregurgitat", "regurgitation"),
    (r"\bvomit|\bthrow\w*\s+up|\bpuk\w*", "vomiting"),
    (r"\bstrain\w*\b.*\b(poop\w*|defecat\w*|stool|droppings)", "straining_to_defecate"),
    (r"\bconstipat|\b(no|hard|dry|small|few)\s+(stool|poop|feces|faeces|droppings)", "constipation"),
    (r"\bdiarrh|\b(loose|runny|watery|soft)\s+(stool|poop|feces|faeces|droppings)", "diarrhea"),
    (r"\b(stool|poop|feces|faeces)\b", "diarrhea"),
    (r"\b(belly|stomach|abdomen|tummy)\b.*\b(pain\w*|hurt\w*|tender|sore)|\b(pain\w*|hurt\w*|sore)\b.*\b(belly|stomach|abdomen|tummy)", "abdominal_pain"),
    // Urinary: inability before straining before blood before frequency.
    (r"\b(cannot|can't|cant|unable to|not able to)\s+(pee|urinate|wee)", "inability_to_urinate"),
    (r"\bstrain\w*\b.*\b(pee\w*|urinat\w*|wee\w*|litter)", "straining_to_urinate"),
    (r"\bblood(y)?\b.*\b(urine|pee|wee)|\b(urine|pee|wee)\b.*\bblood", "blood_in_urine"),
    (r"\b(pee\w*|urinat\w*|wee\w*)\b.*\b(lot|often|frequent\w*|more)", "frequent_urination"),
    (r"\bthirst\w*|\bdrink\w*\b.*\b(lot|more|constantly|loads)", "excessive_thirst"),
    // Systemic and oral colour changes before any eye rule sees the word "eyes".
    (r"\byellow\b.*\b(skin|eyes|gums)|\bjaundic", "jaundice"),
    (r"\bpale\b.*\bgums?|\bgums?\b.*\b(pale|white)", "pale_gums"),
    (r"\b(red|swollen|inflamed|bleeding)\b.*\bgums?|\bgums?\b.*\b(red|swollen|bleeding)", "red_gums"),
    (r"\bdehydrat|\bsunken\s+eyes|\bdry\s+gums", "dehydration"),
    // Respiratory: open-mouth and laboured breathing before the rapid-breathing rule.
    (r"\bopen[- ]mouth(ed)?\s+breath", "open_mouth_breathing"),
    (r"\bgasp\w*", "gasping_at_surface"),
    (r"\b(can't|cannot|trouble|difficult\w*|hard|struggl\w*|labou?red)\b.*\bbreath", "difficulty_breathing"),
    (r"\b(fast|rapid|quick|heavy)\s+breath\w*|\bpanting", "rapid_breathing"),
    (r"\btail\b.*\bbob", "tail_bobbing"),
    (r"\bred\b.*\bgills?|\bgills?\b.*\bred", "red_gills"),
    (r"\bcough", "coughing"),
    (r"\bsneez", "sneezing"),
    (r"\bwheez|\bclicking\b.*\bbreath", "wheezing"),
    (r"\b(runny|snotty|snotty-nosed|crusty)\s+nose|\bnasal\b|\bnose\b.*\b(discharge|runn\w*|drip\w*)", "nasal_discharge"),
    // Eyes.
    (r"\b(discharge|goo\w*|crust\w*|weep\w*|gunk\w*)\b.*\beyes?\b|\beyes?\b.*\b(discharge|goo\w*|crust\w*|weep\w*|gunk\w*)", "eye_discharge"),
    (r"\bcloudy\b.*\beyes?\b|\beyes?\b.*\bcloudy", "cloudy_eyes"),
    (r"\bswollen\b.*\b(eyes?|eyelids?)\b|\b(eyes?|eyelids?)\b.*\bswollen", "swollen_eyes"),
    (r"\bred\b.*\beyes?\b|\beyes?\b.*\bred\b|\bbloodshot", "red_eyes"),
    (r"\bsquint", "squinting"),
    // Ears and head: before the generic itch and tremor rules.
    (r"\bears?\b.*\b(smell\w*|odou?r\w*|stink\w*)", "ear_odor"),
    (r"\bears?\b.*\b(discharge|wax\w*|gunk\w*|pus)", "ear_discharge"),
    (r"\b(scratch\w*|paw\w*)\b.*\bears?\b", "ear_scratching"),
    (r"\bshak\w*\b.*\bhead|\bhead\b.*\bshak", "head_shaking"),
    (r"\bhead\b.*\btilt|\btilt\w*\b.*\bhead", "head_tilt"),
    // Neurological.
    (r"\bseiz|\bconvuls|\bfitting\b", "seizures"),
    (r"\bcollaps", "collapse"),
    (r"\bfaint|\bpassed out", "fainting"),
    (r"\bparaly|\b(can't|cannot|unable to)\s+(walk|stand|move)|\bdragging\b.*\blegs?", "paralysis"),
    (r"\btremb|\bshiver|\btremor|\bshak\w*", "tremors"),
    (r"\bwobbl|\bbalance|\bstumbl|\bcircling", "loss_of_balance"),
    // Musculoskeletal.
    (r"\bsoft\b.*\bshell|\bshell\b.*\b(soft|bend\w*|deform\w*|misshapen)", "soft_shell"),
    (r"\bshell\b.*\b(rot\w*|pit\w*|lesion\w*|spot\w*|patch\w*)", "shell_lesions"),
    (r"\bswollen\b.*\bjoints?|\bjoints?\b.*\bswollen", "swollen_joints"),
    (r"\blimp|\blame\b|\bfavou?r\w*\b.*\bleg", "limping"),
    (r"\bstiff", "joint_stiffness"),
    (r"\b(reluctan\w*|won't|wont|refus\w*)\b.*\b(walk|jump|move|stairs|climb)", "reluctance_to_move"),
    // Skin, coat, fins and feathers.
    (r"\bswollen\b.*\b(face|cheek\w*|muzzle|lips?)", "facial_swelling"),
    (r"\bswollen\b.*\b(glands?|lymph)", "swollen_lymph_nodes"),
    (r"\bscales?\b.*\b(raised|stick\w* out|pine ?cone)", "raised_scales"),
    (r"\bwhite\s+spots?", "white_spots"),
    (r"\bfins?\b.*\b(rot\w*|fray\w*|ragged|torn)", "fin_rot"),
    (r"\bclamp\w*\b.*\bfins?|\bfins?\b.*\bclamp", "clamped_fins"),
    (r"\bfloat\w*|\bsink\w*|\bupside down|\blopsided", "floating_abnormally"),
    (r"\bpluck\w*|\bpull\w*\b.*\bfeathers?|\bbarbering", "feather_plucking"),
    (r"\bfluff\w*|\bpuff\w*\s+up", "fluffed_feathers"),
    (r"\bhot\s+spots?", "hot_spots"),
    (r"\b(hair|fur|coat)\b.*\b(loss|losing|falling|thin\w*|missing|patchy)|\bbald", "hair_loss"),
    (r"\bflak\w*\s+skin|\bdandruff|\bscurf", "dandruff"),
    (r"\bscab|\bcrust", "scabs"),
    (r"\b(lump|bump|mass|growth|tumou?r|swelling)s?\b", "skin_lumps"),
    (r"\bred\b.*\bskin|\bskin\b.*\b(red|inflamed|irritated)|\brash\b", "skin_redness"),
    (r"\b(sore|wound|lesion|ulcer)s?\b.*\bskin|\bskin\b.*\b(sore|wound|lesion|ulcer)s?\b|\bmaggot", "skin_lesions"),
    (r"\blick\w*", "excessive_licking"),
    (r"\bitch|\bscratch|\brubbing\b|\bflashing\b", "itching"),
    // Mouth.
    (r"\bmouth\b.*\b(ulcer\w*|sores?)|\bulcers?\b", "mouth_ulcers"),
    (r"\bteeth\b.*\b(long|overgrown|misaligned)|\bovergrown\b|\bmalocclu", "overgrown_teeth"),
    (r"\b(trouble|difficult\w*|struggl\w*|hard)\b.*\b(eat\w*|chew\w*)|\bdropping\s+food", "difficulty_eating"),
    (r"\b(bad|smelly|stinky)\s+breath", "bad_breath"),
    (r"\bdrool|\bslobber|\bsaliva", "drooling"),
    // Appetite and weight.
    (r"\b(not|won't|wont|refus\w*|stopped|off)\b.*\b(eat\w*|food|meals?)|\bno appetite|\bappetite\b.*\b(loss|lost|poor|decreased|gone)", "loss_of_appetite"),
    (r"\b(losing|lost|loss of)\s+weight|\bweight\s+loss|\b(thin|skinny|bony)\b", "weight_loss"),
    // Heart and stamina before the generic tiredness rule.
    (r"\bmurmur", "heart_murmur"),
    (r"\b(tires?|tired)\s+easily|\bexercise intolerance|\bcan't keep up", "exercise_intolerance"),
    (r"\bfever|\bfeels?\s+(hot|warm)|\btemperature", "fever"),
    (r"\bweak", "weakness"),
    (r"\bletharg|\btired|\bsleep\w*|\b(no|low)\s+energy|\blistless|\bsluggish|\bquiet\b", "lethargy"),
    // Behaviour.
    (r"\brestless|\bpacing|\bcan't settle|\bagitat", "restlessness"),
    (r"\b(hiding|hides|hid)\b", "hiding"),
    (r"\b(aggress\w*|biting|snapping|growl\w*)", "aggression"),
    (r"\bdischarge\b.*\b(vagina\w*|vulva)|\bvaginal", "vaginal_discharge"),
];

/// A single compiled `(pattern, canonical key)` rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    target: String,
}

impl Rule {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// An ordered, validated rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile `rules` in order, checking every target against the vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RuleTable` if a pattern does not compile or a target is not a
    /// canonical key.
    pub fn new(rules: &[(&str, &str)], vocabulary: &Vocabulary) -> EngineResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());

        for (position, (pattern, target)) in rules.iter().enumerate() {
            if !vocabulary.contains(target) {
                return Err(EngineError::RuleTable(format!(
                    "rule {position} ('{pattern}') targets unknown canonical key '{target}'"
                )));
            }
            let regex = Regex::new(pattern).map_err(|e| {
                EngineError::RuleTable(format!("rule {position} ('{pattern}') does not compile: {e}"))
            })?;
            compiled.push(Rule {
                pattern: regex,
                target: (*target).to_string(),
            });
        }

        Ok(Self { rules: compiled })
    }

    /// The [`STANDARD_RULES`] table compiled against `vocabulary`.
    pub fn standard(vocabulary: &Vocabulary) -> EngineResult<Self> {
        Self::new(STANDARD_RULES, vocabulary)
    }

    /// First rule whose pattern matches `folded`, as `(rule position, canonical key)`.
    pub fn first_match(&self, folded: &str) -> Option<(usize, &str)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.is_match(folded))
            .map(|(position, rule)| (position, rule.target.as_str()))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
