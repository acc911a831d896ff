// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message texts.
//!
//! Wording only; no dialogue logic lives here. Texts use the transport's
//! lightweight markup (`_italic_`).

use std::collections::BTreeMap;

use crate::dialogue::{NAME_FIELD, SELECTED_OPTION_FIELD};

pub fn welcome() -> String {
    "EP ENGENHARIA

Olá! Seja bem-vindo(a)! ☀️

_Estamos aqui para ajudar você com qualquer dúvida ou informação que precise. Enquanto aguardamos o atendimento, gostaríamos de convidá-lo(a) a nos seguir nas redes sociais para ficar por dentro dos nossos trabalhos!_

Instagram 👇🏻
https://www.instagram.com/ep.energiasolar"
        .to_string()
}

pub fn name_request() -> String {
    "_Qual é o seu nome?_ 😊".to_string()
}

/// The numbered main menu, greeting the contact by name when known.
pub fn main_menu(name: Option<&str>) -> String {
    let greeting = match name {
        Some(name) if !name.is_empty() => format!("Olá, {name}!"),
        _ => "Olá!".to_string(),
    };
    format!(
        "{greeting}

_Para atendê-lo(a) de forma personalizada, precisamos saber um pouco mais sobre o que você precisa. Por favor, selecione uma das opções abaixo:_

1️⃣ Reduzir conta de luz em até 95% 📉:
Se você está pronto para solicitar um orçamento ou proposta para a instalação de painéis solares.

2️⃣ Poço artesiano com painel solar 💧:
A solução perfeita para quem busca eficiência, economia e sustentabilidade no manejo de água, sendo ideais para áreas remotas ou locais sem acesso à rede elétrica.

3️⃣ Usinas de investimentos 📊:
Se você quer saber mais sobre como a energia solar pode ser um investimento sustentável.

4️⃣ Financiamento e Incentivos 💰:
Se você quer saber mais sobre opções de financiamento e incentivos para a instalação de energia solar.

5️⃣ Suporte técnico 👷🏻‍♂️:
Preciso de ajuda com a minha instalação.

6️⃣ Falar com um(a) atendente 🧑🏻‍💻:
Se você tiver alguma outra dúvida ou assunto que não esteja listado acima.

_Digite o número da opção desejada_"
    )
}

pub fn menu_tip() -> &'static str {
    "💡 _Digite \"menu\" para voltar_"
}

/// Opening prompt of a branch; asks for the branch's first field.
pub fn branch_opening(option: u8) -> String {
    let body = match option {
        1 => {
            "_Quero reduzir a minha conta de energia em até 95% 💰_

Para prosseguir, gostaríamos de saber mais sobre sua residência ou empresa. Por favor, responda com as seguintes informações:

_Quantos kWh atende sua necessidade?_
Obs: se você não souber, pode responder com o valor aproximado da sua conta de luz."
        }
        2 => {
            "_Quero instalar meu poço artesiano com painel solar 💦_

Para prosseguir, gostaríamos de saber mais sobre o seu poço artesiano. Por favor, responda com as seguintes informações:

_Qual é a profundidade do seu poço artesiano?_"
        }
        3 => {
            "_Estou interessado em usinas de investimento 📊_

Para prosseguir, gostaríamos de saber mais sobre o seu interesse em investir em energia solar. Por favor, responda com as seguintes informações:

_Qual é o seu objetivo de investimento?_"
        }
        4 => {
            "_Financiamento e Incentivos 🏦_

Para prosseguir, gostaríamos de saber mais sobre o seu interesse em financiamento e incentivos. Por favor, responda com as seguintes informações:

_Qual é o seu orçamento para a instalação de painéis solares?_"
        }
        _ => {
            "_Suporte técnico 🛠️_

Para prosseguir, gostaríamos de saber mais sobre o problema técnico que você está enfrentando. Por favor, responda com as seguintes informações:

_Qual é o problema técnico que você está enfrentando?_"
        }
    };
    format!("{body}\n\n{}", menu_tip())
}

/// Follow-up prompt for a branch field after the first.
pub fn field_prompt(field: &str) -> String {
    let question = match field {
        "panelPreference" => {
            "_Você tem alguma preferência de equipamento (marca ou tipo de painel)?_"
        }
        "waterFlow" => "_Qual é a vazão de água necessária (litros por hora ou por dia)?_",
        "pumpPreference" => "_Você tem alguma preferência de bomba (submersa, de superfície)?_",
        "riskProfile" => "_Qual é o seu perfil de risco (conservador, moderado ou arrojado)?_",
        "investmentType" => {
            "_Que tipo de investimento você procura (usina própria ou cota em usina compartilhada)?_"
        }
        "financingPreference" => {
            "_Qual é a sua preferência de financiamento (banco, cooperativa ou consórcio)?_"
        }
        "wantsIncentives" => {
            "_Você tem interesse em conhecer os incentivos e linhas de crédito disponíveis? (sim/não)_"
        }
        "errorMessage" => "_O equipamento exibe alguma mensagem ou código de erro? Qual?_",
        "wantsTechnicalVisit" => "_Você gostaria de agendar uma visita técnica? (sim/não)_",
        _ => "_Pode nos contar um pouco mais?_",
    };
    format!("{question}\n\n{}", menu_tip())
}

pub fn forwarded_to_human() -> String {
    "_Falar com um(a) atendente 👩‍💻👨‍💻_

Um de nossos atendentes entrará em contato com você em breve. Por favor, aguarde alguns minutos.

_Estamos aqui para ajudar! 😊_"
        .to_string()
}

pub fn thank_you() -> String {
    "_Obrigado pelas informações!_

Nossa equipe irá analisar seus dados e entrará em contato em breve com uma proposta personalizada.

_O atendimento automatizado será pausado por alguns minutos para que você possa processar as informações. Se precisar de algo urgente, nossa equipe estará disponível em breve! 😊_"
        .to_string()
}

pub fn invalid_option() -> String {
    format!(
        "_Desculpe, não entendi sua opção. Por favor, digite apenas o número correspondente à opção desejada._\n\n{}",
        menu_tip()
    )
}

/// Generic apology sent when a step fails. Never carries error details.
pub fn apology() -> String {
    format!(
        "_Ops! Ocorreu um erro inesperado. Nossa equipe foi notificada e irá resolver em breve._\n\n_Você pode tentar novamente ou aguardar que entraremos em contato! 😊_\n\n{}",
        menu_tip()
    )
}

pub fn opt_out_ack() -> String {
    "_Tudo certo! Você não receberá mais mensagens automáticas._".to_string()
}

/// Display name of a menu option, as used in the summary.
pub fn option_name(code: &str) -> Option<&'static str> {
    match code {
        "1" => Some("Reduzir conta de luz em até 95%"),
        "2" => Some("Poço artesiano com painel solar"),
        "3" => Some("Usinas de investimentos"),
        "4" => Some("Financiamento e Incentivos"),
        "5" => Some("Suporte técnico"),
        _ => None,
    }
}

/// Summary labels in display order.
const SUMMARY_LABELS: &[(&str, &str)] = &[
    ("energyConsumption", "🏠 Quantos kWh atende sua necessidade"),
    ("panelPreference", "🔋 Preferência de equipamento"),
    ("wellDepth", "🕳️ Profundidade do poço"),
    ("waterFlow", "💧 Vazão necessária"),
    ("pumpPreference", "🔧 Preferência de bomba"),
    ("investmentGoal", "🎯 Objetivo de investimento"),
    ("riskProfile", "📊 Perfil de risco"),
    ("investmentType", "💼 Tipo de investimento"),
    ("budget", "💰 Orçamento"),
    ("financingPreference", "🏦 Preferência de financiamento"),
    ("wantsIncentives", "🎁 Interesse em incentivos"),
    ("technicalProblem", "🔧 Problema técnico"),
    ("errorMessage", "❌ Mensagem de erro"),
    ("wantsTechnicalVisit", "🚗 Visita técnica"),
];

/// Personalized summary of everything collected so far.
pub fn summary(fields: &BTreeMap<String, String>) -> String {
    let name = fields.get(NAME_FIELD).filter(|n| !n.is_empty());
    let mut out = match name {
        Some(name) => format!("_📋 Resumo das informações de {name}:_\n\n"),
        None => "_📋 Resumo das suas informações:_\n\n".to_string(),
    };

    if let Some(name) = name {
        out.push_str(&format!("👤 Nome: {name}\n"));
    }
    if let Some(option) = fields
        .get(SELECTED_OPTION_FIELD)
        .and_then(|code| option_name(code))
    {
        out.push_str(&format!("🎯 Opção escolhida: {option}\n"));
    }
    for (field, label) in SUMMARY_LABELS {
        if let Some(value) = fields.get(*field).filter(|v| !v.is_empty()) {
            out.push_str(&format!("{label}: {value}\n"));
        }
    }
    out
}
